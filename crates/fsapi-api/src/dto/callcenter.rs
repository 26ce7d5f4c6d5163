//! mod_callcenter DTOs

use super::Checked;
use serde::Deserialize;
use validator::Validate;

/// Keys accepted by `agent set`
pub const AGENT_SET_KEYS: &[&str] = &[
    "status",
    "state",
    "contact",
    "type",
    "max_no_answer",
    "wrap_up_time",
    "reject_delay_time",
    "busy_delay_time",
    "ready_time",
];

/// Keys accepted by `tier set`
pub const TIER_SET_KEYS: &[&str] = &["state", "level", "position"];

/// Agent types mod_callcenter knows
pub const AGENT_TYPES: &[&str] = &["callback", "uuid-standby"];

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AgentAddRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    /// `callback` or `uuid-standby`
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub agent_type: String,

    /// Tenant the agent belongs to; required for restricted callers
    #[serde(default)]
    pub domain: String,
}

impl Checked for AgentAddRequest {
    const FIELDS: &'static [&'static str] = &["name", "agent_type", "type"];
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentDeleteRequest {
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AgentSetRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub domain: String,
}

impl Checked for AgentSetRequest {
    const FIELDS: &'static [&'static str] = &["key"];
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TierAddRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "queue is required"))]
    pub queue: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "agent is required"))]
    pub agent: String,

    #[serde(default)]
    pub level: String,

    #[serde(default)]
    pub position: String,
}

impl Checked for TierAddRequest {
    const FIELDS: &'static [&'static str] = &["queue", "agent"];
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TierDeleteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "queue is required"))]
    pub queue: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "agent is required"))]
    pub agent: String,
}

impl Checked for TierDeleteRequest {
    const FIELDS: &'static [&'static str] = &["queue", "agent"];
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TierSetRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "queue is required"))]
    pub queue: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "agent is required"))]
    pub agent: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "key is required"))]
    pub key: String,

    #[serde(default)]
    pub value: String,
}

impl Checked for TierSetRequest {
    const FIELDS: &'static [&'static str] = &["queue", "agent", "key"];
}

/// `?status=` filter of the queue agent count
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentCountQuery {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_missing_field_wins() {
        let req: TierSetRequest = serde_json::from_value(json!({"key": "level"})).unwrap();
        assert_eq!(req.check().unwrap_err().to_string(), "queue is required");

        let req: TierSetRequest =
            serde_json::from_value(json!({"queue": "q@acme.com"})).unwrap();
        assert_eq!(req.check().unwrap_err().to_string(), "agent is required");
    }

    #[test]
    fn test_agent_add_type_field() {
        let req: AgentAddRequest =
            serde_json::from_value(json!({"name": "1000@acme.com", "type": "callback"}))
                .unwrap();
        assert_eq!(req.agent_type, "callback");
        assert!(req.check().is_ok());

        let req: AgentAddRequest =
            serde_json::from_value(json!({"name": "1000@acme.com"})).unwrap();
        assert_eq!(req.check().unwrap_err().to_string(), "type is required");
    }
}
