//! Response envelopes shared by all endpoints

use fsapi_esl::Row;
use serde::Serialize;

/// `status` value of every successful response
pub const STATUS_SUCCESS: &str = "success";

/// `{status, message}`
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: message.into(),
        }
    }
}

/// `{status, data}`
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            data,
        }
    }
}

/// Entity listing after tenant filtering
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub row_count: usize,
    pub rows: Vec<Row>,
}

impl ListResponse {
    pub fn success(rows: Vec<Row>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            row_count: rows.len(),
            rows,
        }
    }
}

/// `{status, count}`
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub status: &'static str,
    pub count: i64,
}

impl CountResponse {
    pub fn success(count: i64) -> Self {
        Self {
            status: STATUS_SUCCESS,
            count,
        }
    }
}
