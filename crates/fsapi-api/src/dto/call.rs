//! Call control DTOs
//!
//! Request bodies for the `/v1/calls` endpoints. Optional string fields
//! default to empty so a missing field and an empty one behave the same.

use super::Checked;
use fsapi_esl::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Hangup body; the whole body is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HangupRequest {
    #[serde(default)]
    pub cause: String,
}

/// Transfer one or both legs to a new destination
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "destination is required"))]
    pub destination: String,

    /// Dialplan type, `XML` when only a context is given
    #[serde(default)]
    pub dialplan: String,

    #[serde(default)]
    pub context: String,

    /// `aleg` (default), `bleg` or `both`
    #[serde(default)]
    pub leg: String,
}

impl Checked for TransferRequest {
    const FIELDS: &'static [&'static str] = &["destination"];
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRequest {
    #[serde(default)]
    pub uuid_a: String,

    #[serde(default)]
    pub uuid_b: String,
}

/// `hold` or `unhold`
#[derive(Debug, Clone, Deserialize)]
pub struct HoldRequest {
    #[serde(default)]
    pub action: String,
}

/// `start` (with an absolute filename) or `stop`
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DtmfRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "digits are required"))]
    pub digits: String,

    /// Tone duration in milliseconds, 0 means the default
    #[serde(default)]
    pub duration: u32,
}

impl Checked for DtmfRequest {
    const FIELDS: &'static [&'static str] = &["digits"];
}

/// Place a new call
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OriginateRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "aleg is required"))]
    pub aleg: String,

    /// Extension or `&application()`; parks the call when empty
    #[serde(default)]
    pub bleg: String,

    #[serde(default)]
    pub dialplan: String,

    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub caller_id_name: String,

    #[serde(default)]
    pub caller_id_number: String,

    #[serde(default)]
    pub timeout_sec: u32,

    /// Extra `{k=v}` variables; strings, booleans and numbers
    #[serde(default)]
    pub channel_variables: BTreeMap<String, Value>,
}

impl Checked for OriginateRequest {
    const FIELDS: &'static [&'static str] = &["aleg"];
}

/// Detail dump of one leg
#[derive(Debug, Clone, Serialize)]
pub struct LegDetails {
    pub uuid: String,
    pub details: Option<Value>,
}

/// `GET /v1/calls/{uuid}`
#[derive(Debug, Clone, Serialize)]
pub struct CallDetailsResponse {
    pub status: &'static str,
    pub call_info: Row,
    pub aleg: LegDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleg: Option<LegDetails>,
}
