//! Unified error handling for fsapi
//!
//! Every failure a handler can surface is a variant of [`ApiError`]. The
//! `ResponseError` implementation renders the `{status:"error", message}`
//! envelope with the matching HTTP status code.

use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Main application error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ==================== Client Errors ====================
    /// Malformed input; never reaches the switch
    #[error("{0}")]
    Validation(String),

    /// Missing or rejected bearer token
    #[error("{0}")]
    Unauthorized(String),

    /// Resolved tenant is outside the caller's scope
    #[error("{0}")]
    Forbidden(String),

    /// Entity absent on the switch
    #[error("{0}")]
    NotFound(String),

    // ==================== Switch Errors ====================
    /// Control channel could not be established, timed out, or broke
    #[error("{0}")]
    EslConnection(String),

    /// Switch answered a well-formed command with `-ERR`
    #[error("{0}")]
    EslCommand(String),

    /// Reply did not have the expected shape
    #[error("{0}")]
    UpstreamFormat(String),

    // ==================== Internal Errors ====================
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::EslCommand(_) => StatusCode::BAD_GATEWAY,
            ApiError::EslConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamFormat(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::EslConnection(_) => "esl_connection_error",
            ApiError::EslCommand(_) => "esl_command_error",
            ApiError::UpstreamFormat(_) => "upstream_format_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        ApiError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!(code = self.error_code(), status = status.as_u16(), "{}", self);
        } else {
            warn!(code = self.error_code(), status = status.as_u16(), "{}", self);
        }

        let mut builder = HttpResponse::build(status);
        if let ApiError::Unauthorized(_) = self {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }

        builder.json(json!({
            "status": "error",
            "message": self.to_string(),
        }))
    }
}
