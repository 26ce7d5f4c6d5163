//! Shared fixtures for handler tests

#![allow(dead_code)]

use async_trait::async_trait;
use fsapi_esl::{Command, CommandChannel, EslError};
use std::sync::{Arc, Mutex};

pub const ACME_CALL: &str = "11111111-1111-4111-8111-111111111111";
pub const ACME_BLEG: &str = "22222222-2222-4222-8222-222222222222";
pub const OTHER_CALL: &str = "33333333-3333-4333-8333-333333333333";
pub const MISSING_CALL: &str = "44444444-4444-4444-8444-444444444444";

type Responder = Box<dyn Fn(&Command) -> Result<String, EslError> + Send + Sync>;

/// Channel double answering from a closure and recording every command
pub struct FakeSwitch {
    responder: Responder,
    sent: Mutex<Vec<String>>,
}

impl FakeSwitch {
    pub fn new(
        responder: impl Fn(&Command) -> Result<String, EslError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Every command as `api <name> <args>`, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_with(&self, name: &str) -> Vec<String> {
        let prefix = format!("api {}", name);
        self.sent()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }
}

#[async_trait]
impl CommandChannel for FakeSwitch {
    async fn send(&self, command: Command) -> Result<String, EslError> {
        self.sent.lock().unwrap().push(command.to_string());
        (self.responder)(&command)
    }
}

/// `show calls as json` with one acme.com bridge and one other.com call
pub fn calls_json() -> String {
    serde_json::json!({
        "row_count": 2,
        "rows": [
            {
                "uuid": ACME_CALL,
                "b_uuid": ACME_BLEG,
                "direction": "inbound",
                "accountcode": "acme.com",
                "cid_num": "1000",
            },
            {
                "uuid": OTHER_CALL,
                "b_uuid": "",
                "direction": "outbound",
                "accountcode": "other.com",
                "cid_num": "2000",
            },
        ],
    })
    .to_string()
}

pub const QUEUE_TABLE: &str = "name|strategy|moh_sound\n\
support@acme.com|longest-idle-agent|local_stream://moh\n\
sales@acme.com|ring-all|local_stream://moh\n\
support@other.com|ring-all|local_stream://moh\n\
+OK\n";

pub const AGENT_TABLE: &str = "name|system|type|contact|status\n\
1000@acme.com|single_box|callback|{domain_name=acme.com}user/1000|Available\n\
4000@acme.com|single_box|callback|[domain_name=acme.com]user/4000|Available\n\
2000@other.com|single_box|callback|{domain_name=other.com,call_timeout=20}user/2000|Logged Out\n\
3000|single_box|callback|user/3000|Available\n\
+OK\n";

pub const TIER_TABLE: &str = "queue|agent|state|level|position\n\
support@acme.com|1000@acme.com|Ready|1|1\n\
support@other.com|2000@other.com|Ready|1|1\n\
+OK\n";

/// Replies shared by most tests; anything else is `+OK`
pub fn default_switch() -> Arc<FakeSwitch> {
    FakeSwitch::new(|cmd| {
        let reply = match (cmd.name(), cmd.args()) {
            ("show", "calls as json") => calls_json(),
            ("uuid_dump", args) if args.starts_with(ACME_CALL) => {
                r#"{"Channel-State":"CS_EXECUTE","Caller-Caller-ID-Number":"1000"}"#.to_string()
            }
            ("uuid_dump", _) => return Err(EslError::Remote("-ERR No such channel!".into())),
            ("callcenter_config", "queue list") => QUEUE_TABLE.to_string(),
            ("callcenter_config", "queue count") => "+OK\n\n3\n".to_string(),
            ("callcenter_config", "agent list") => AGENT_TABLE.to_string(),
            ("callcenter_config", "tier list") => TIER_TABLE.to_string(),
            ("callcenter_config", args) if args.starts_with("queue count") => "7\n".to_string(),
            ("originate", _) => "+OK 55555555-5555-4555-8555-555555555555\n".to_string(),
            _ => "+OK\n".to_string(),
        };
        Ok(reply)
    })
}

/// Build an initialized test service around a switch double
macro_rules! service {
    ($switch:expr) => {{
        let channel: std::sync::Arc<dyn fsapi_esl::CommandChannel> = $switch.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from(channel))
                .configure(fsapi_api::extractor_error_handlers(1024 * 1024))
                .wrap(actix_web::middleware::from_fn(fsapi_auth::assign_request_id))
                .configure(fsapi_api::configure_health)
                .configure(fsapi_api::configure),
        )
        .await
    }};
}
