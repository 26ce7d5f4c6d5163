//! Command builders and input checks
//!
//! Every string the API sends to the switch is assembled here. Values
//! interpolated into a command are checked first: tokens may not contain
//! whitespace or control characters, quoted values may not contain control
//! characters or a single quote. A request can therefore never smuggle a
//! second argument or an extra protocol line into a command.

use crate::dto::OriginateRequest;
use fsapi_core::ApiError;
use fsapi_esl::Command;
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_HANGUP_CAUSE: &str = "NORMAL_CLEARING";
pub const DEFAULT_DTMF_DURATION_MS: u32 = 100;
pub const PARK_APPLICATION: &str = "&park()";
pub const DEFAULT_DIALPLAN: &str = "XML";
pub const CALLCENTER: &str = "callcenter_config";

/// Characters that would break out of an originate `{k=v,...}` block
const VARIABLE_BREAKERS: &[char] = &[',', '{', '}', '\''];

// ===== Input checks =====

pub fn validate_uuid(value: &str) -> Result<(), ApiError> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ApiError::Validation(format!("invalid UUID format: {}", value)))
}

/// Recording targets must be absolute and free of `..`
pub fn validate_file_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".to_string());
    }
    if !Path::new(path).is_absolute() {
        return Err("path must be absolute".to_string());
    }
    if path.contains("..") {
        return Err("path traversal not allowed".to_string());
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("path must not contain whitespace or control characters".to_string());
    }
    Ok(())
}

/// A single command argument
pub fn validate_token(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ApiError::Validation(format!(
            "{} must not contain whitespace or control characters",
            field
        )));
    }
    Ok(())
}

/// A value the command wraps in single quotes
pub fn validate_quoted(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().any(|c| c.is_control() || c == '\'') {
        return Err(ApiError::Validation(format!(
            "{} must not contain control characters or single quotes",
            field
        )));
    }
    Ok(())
}

fn validate_variable(key: &str, value: &str) -> Result<(), ApiError> {
    let bad = |s: &str| {
        s.chars()
            .any(|c| c.is_whitespace() || c.is_control() || VARIABLE_BREAKERS.contains(&c))
    };
    if key.is_empty() || key.contains('=') || bad(key) || bad(value) {
        return Err(ApiError::Validation(format!(
            "channel variable '{}' contains characters that are not allowed",
            key
        )));
    }
    Ok(())
}

// ===== Call control =====

/// Which side of a call a transfer applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    A,
    B,
    Both,
}

impl Leg {
    /// Case-insensitive; empty means the A-leg
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "" | "aleg" => Some(Leg::A),
            "bleg" => Some(Leg::B),
            "both" => Some(Leg::Both),
            _ => None,
        }
    }

    fn flag(&self) -> Option<&'static str> {
        match self {
            Leg::A => None,
            Leg::B => Some("-bleg"),
            Leg::Both => Some("-both"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Leg::A => "A-leg",
            Leg::B => "B-leg",
            Leg::Both => "both legs",
        }
    }
}

pub fn hangup(uuid: &str, cause: &str) -> Command {
    Command::new("uuid_kill", format!("{} {}", uuid, cause))
}

/// `uuid_transfer <uuid> [-bleg|-both] <dest> [<dialplan> <context>]`
///
/// Dialplan and context go together; the dialplan defaults to `XML` once a
/// context is given.
pub fn transfer(uuid: &str, leg: Leg, destination: &str, dialplan: &str, context: &str) -> Command {
    let mut args = vec![uuid];
    args.extend(leg.flag());
    args.push(destination);

    if !context.is_empty() {
        args.push(if dialplan.is_empty() {
            DEFAULT_DIALPLAN
        } else {
            dialplan
        });
        args.push(context);
    }

    Command::new("uuid_transfer", args.join(" "))
}

pub fn bridge(uuid_a: &str, uuid_b: &str) -> Command {
    Command::new("uuid_bridge", format!("{} {}", uuid_a, uuid_b))
}

pub fn answer(uuid: &str) -> Command {
    Command::new("uuid_answer", uuid)
}

pub fn park(uuid: &str) -> Command {
    Command::new("uuid_park", uuid)
}

pub fn hold(uuid: &str, on: bool) -> Command {
    if on {
        Command::new("uuid_hold", uuid)
    } else {
        Command::new("uuid_hold", format!("off {}", uuid))
    }
}

pub fn record_start(uuid: &str, path: &str) -> Command {
    Command::new("uuid_record", format!("{} start {}", uuid, path))
}

pub fn record_stop(uuid: &str) -> Command {
    Command::new("uuid_record", format!("{} stop all", uuid))
}

pub fn send_dtmf(uuid: &str, digits: &str, duration_ms: u32) -> Command {
    Command::new("uuid_send_dtmf", format!("{} {}@{}", uuid, digits, duration_ms))
}

fn variable_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check every value an originate request interpolates
pub fn validate_originate(req: &OriginateRequest) -> Result<(), ApiError> {
    validate_token("aleg", &req.aleg)?;
    validate_token("bleg", &req.bleg)?;
    validate_token("dialplan", &req.dialplan)?;
    validate_token("context", &req.context)?;
    validate_token("caller_id_number", &req.caller_id_number)?;
    validate_quoted("caller_id_name", &req.caller_id_name)?;

    for (key, value) in &req.channel_variables {
        validate_variable(key, &variable_value(value))?;
    }
    Ok(())
}

/// `originate [{vars}]<aleg> <bleg|&park()> [dialplan] [context] [timeout]`
///
/// Caller id always travels as `origination_caller_id_*` variables, so the
/// positional caller id arguments are never needed.
pub fn originate(req: &OriginateRequest) -> Command {
    let mut vars: Vec<String> = req
        .channel_variables
        .iter()
        .map(|(key, value)| format!("{}={}", key, variable_value(value)))
        .collect();

    if !req.caller_id_number.is_empty() {
        vars.push(format!("origination_caller_id_number={}", req.caller_id_number));
    }
    if !req.caller_id_name.is_empty() {
        vars.push(format!("origination_caller_id_name='{}'", req.caller_id_name));
    }

    let block = if vars.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", vars.join(","))
    };

    let bleg = if req.bleg.is_empty() {
        PARK_APPLICATION
    } else {
        req.bleg.as_str()
    };

    let mut args = format!("{}{} {}", block, req.aleg, bleg);

    for part in [&req.dialplan, &req.context] {
        if !part.is_empty() {
            args.push(' ');
            args.push_str(part);
        }
    }

    if req.timeout_sec > 0 {
        args.push_str(&format!(" {}", req.timeout_sec));
    }

    Command::new("originate", args)
}

// ===== Queries =====

pub fn show_calls() -> Command {
    Command::new("show", "calls as json")
}

pub fn show_registrations() -> Command {
    Command::new("show", "registrations as json")
}

pub fn uuid_dump(uuid: &str) -> Command {
    Command::new("uuid_dump", format!("{} json", uuid))
}

/// Structured status through the `json` API
pub fn status_json() -> Command {
    Command::new("json", r#"{"command":"status","data":""}"#)
}

/// Plain `status`, used as the health probe
pub fn status() -> Command {
    Command::bare("status")
}

// ===== Callcenter =====

/// Per-queue listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueListing {
    Agents,
    Members,
    Tiers,
}

impl QueueListing {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueListing::Agents => "agents",
            QueueListing::Members => "members",
            QueueListing::Tiers => "tiers",
        }
    }
}

/// Queue lifecycle operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    Load,
    Unload,
    Reload,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::Load => "load",
            QueueAction::Unload => "unload",
            QueueAction::Reload => "reload",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            QueueAction::Load => "loaded",
            QueueAction::Unload => "unloaded",
            QueueAction::Reload => "reloaded",
        }
    }
}

fn callcenter(args: String) -> Command {
    Command::new(CALLCENTER, args)
}

pub fn queue_list() -> Command {
    callcenter("queue list".to_string())
}

pub fn queue_count() -> Command {
    callcenter("queue count".to_string())
}

pub fn queue_list_of(listing: QueueListing, queue: &str) -> Command {
    callcenter(format!("queue list {} {}", listing.as_str(), queue))
}

/// `queue count <kind> <queue>`; only agent counts take a status filter
pub fn queue_count_of(listing: QueueListing, queue: &str, status: Option<&str>) -> Command {
    match status.filter(|s| !s.is_empty()) {
        Some(status) => callcenter(format!(
            "queue count {} {} {}",
            listing.as_str(),
            queue,
            status
        )),
        None => callcenter(format!("queue count {} {}", listing.as_str(), queue)),
    }
}

pub fn queue_action(action: QueueAction, queue: &str) -> Command {
    callcenter(format!("queue {} {}", action.as_str(), queue))
}

pub fn agent_list() -> Command {
    callcenter("agent list".to_string())
}

pub fn agent_add(name: &str, agent_type: &str) -> Command {
    callcenter(format!("agent add {} {}", name, agent_type))
}

pub fn agent_del(name: &str) -> Command {
    callcenter(format!("agent del {}", name))
}

pub fn agent_set(key: &str, name: &str, value: &str) -> Command {
    callcenter(format!("agent set {} {} '{}'", key, name, value))
}

pub fn tier_list() -> Command {
    callcenter("tier list".to_string())
}

/// `tier add <queue> <agent> [level] [position]`
pub fn tier_add(queue: &str, agent: &str, level: &str, position: &str) -> Command {
    let mut args = format!("tier add {} {}", queue, agent);
    for part in [level, position] {
        if !part.is_empty() {
            args.push(' ');
            args.push_str(part);
        }
    }
    callcenter(args)
}

/// Queue comes first
pub fn tier_del(queue: &str, agent: &str) -> Command {
    callcenter(format!("tier del {} {}", queue, agent))
}

pub fn tier_set(key: &str, queue: &str, agent: &str, value: &str) -> Command {
    callcenter(format!("tier set {} {} {} '{}'", key, queue, agent, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UUID: &str = "5d5f0d3c-2a5e-4e49-a30b-4b8d0f6c1a11";

    fn originate_req(value: Value) -> OriginateRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_call_commands() {
        assert_eq!(
            hangup(UUID, DEFAULT_HANGUP_CAUSE).to_string(),
            format!("api uuid_kill {} NORMAL_CLEARING", UUID)
        );
        assert_eq!(
            hold(UUID, false).to_string(),
            format!("api uuid_hold off {}", UUID)
        );
        assert_eq!(
            record_stop(UUID).to_string(),
            format!("api uuid_record {} stop all", UUID)
        );
        assert_eq!(
            send_dtmf(UUID, "123#", DEFAULT_DTMF_DURATION_MS).to_string(),
            format!("api uuid_send_dtmf {} 123#@100", UUID)
        );
        assert_eq!(
            uuid_dump(UUID).to_string(),
            format!("api uuid_dump {} json", UUID)
        );
        assert_eq!(
            status_json().to_string(),
            r#"api json {"command":"status","data":""}"#
        );
    }

    #[test]
    fn test_transfer_variants() {
        assert_eq!(
            transfer(UUID, Leg::A, "1000", "", "").args(),
            format!("{} 1000", UUID)
        );
        assert_eq!(
            transfer(UUID, Leg::B, "1000", "", "default").args(),
            format!("{} -bleg 1000 XML default", UUID)
        );
        assert_eq!(
            transfer(UUID, Leg::Both, "1000", "inline", "acme.com").args(),
            format!("{} -both 1000 inline acme.com", UUID)
        );
        // A dialplan without a context is dropped
        assert_eq!(
            transfer(UUID, Leg::A, "1000", "XML", "").args(),
            format!("{} 1000", UUID)
        );
    }

    #[test]
    fn test_leg_parse() {
        assert_eq!(Leg::parse(""), Some(Leg::A));
        assert_eq!(Leg::parse("BLEG"), Some(Leg::B));
        assert_eq!(Leg::parse("both"), Some(Leg::Both));
        assert_eq!(Leg::parse("cleg"), None);
    }

    #[test]
    fn test_originate_parks_by_default() {
        let cmd = originate(&originate_req(json!({"aleg": "user/1000"})));
        assert_eq!(cmd.to_string(), "api originate user/1000 &park()");
    }

    #[test]
    fn test_originate_full() {
        let req = originate_req(json!({
            "aleg": "sofia/gateway/gw1/5551234",
            "bleg": "1000",
            "dialplan": "XML",
            "context": "acme.com",
            "caller_id_name": "Front Desk",
            "caller_id_number": "5550000",
            "timeout_sec": 30,
            "channel_variables": {"ignore_early_media": true, "leg_timeout": 20, "accountcode": "acme.com"},
        }));

        assert_eq!(
            originate(&req).args(),
            "{accountcode=acme.com,ignore_early_media=true,leg_timeout=20,\
             origination_caller_id_number=5550000,origination_caller_id_name='Front Desk'}\
             sofia/gateway/gw1/5551234 1000 XML acme.com 30"
        );
    }

    #[test]
    fn test_callcenter_commands() {
        assert_eq!(queue_list().to_string(), "api callcenter_config queue list");
        assert_eq!(
            queue_count_of(QueueListing::Agents, "q@acme.com", Some("Available")).args(),
            "queue count agents q@acme.com Available"
        );
        assert_eq!(
            queue_count_of(QueueListing::Members, "q@acme.com", None).args(),
            "queue count members q@acme.com"
        );
        assert_eq!(
            queue_action(QueueAction::Reload, "q@acme.com").args(),
            "queue reload q@acme.com"
        );
        assert_eq!(
            agent_set("status", "1000@acme.com", "On Break").args(),
            "agent set status 1000@acme.com 'On Break'"
        );
        assert_eq!(
            tier_add("q@acme.com", "1000@acme.com", "", "2").args(),
            "tier add q@acme.com 1000@acme.com 2"
        );
        assert_eq!(
            tier_del("q@acme.com", "1000@acme.com").args(),
            "tier del q@acme.com 1000@acme.com"
        );
        assert_eq!(
            tier_set("level", "q@acme.com", "1000@acme.com", "3").args(),
            "tier set level q@acme.com 1000@acme.com '3'"
        );
    }

    #[test]
    fn test_input_checks() {
        assert!(validate_uuid(UUID).is_ok());
        assert_eq!(
            validate_uuid("not-a-uuid").unwrap_err().to_string(),
            "invalid UUID format: not-a-uuid"
        );

        assert!(validate_file_path("/var/rec/call.wav").is_ok());
        assert_eq!(validate_file_path("rec.wav").unwrap_err(), "path must be absolute");
        assert_eq!(
            validate_file_path("/var/rec/../../etc/passwd").unwrap_err(),
            "path traversal not allowed"
        );

        assert!(validate_token("destination", "1000").is_ok());
        assert!(validate_token("destination", "1000\napi shutdown").is_err());
        assert!(validate_token("destination", "1000 XML").is_err());

        assert!(validate_quoted("value", "On Break").is_ok());
        assert!(validate_quoted("value", "x' && '").is_err());
    }

    #[test]
    fn test_originate_rejects_variable_injection() {
        let req = originate_req(json!({
            "aleg": "user/1000",
            "channel_variables": {"a": "x,b=y}"},
        }));
        assert!(validate_originate(&req).is_err());

        let req = originate_req(json!({
            "aleg": "user/1000",
            "channel_variables": {"sip_h_X-Tenant": "acme.com"},
        }));
        assert!(validate_originate(&req).is_ok());
    }
}
