//! FreeSWITCH Event Socket Layer (ESL) control channel for fsapi
//!
//! This crate owns everything between an HTTP handler and the switch:
//!
//! - TCP connection with password authentication
//! - `api` command framing and reply parsing
//! - A lock-guarded session that reconnects lazily after transport failures
//! - Parsers for the reply shapes the switch produces (tables, counters,
//!   JSON row sets, embedded tokens)
//!
//! # Architecture
//!
//! ```text
//!   HTTP handler
//!         |
//!         v
//!  CommandChannel (trait)  <-- EslSession (Mutex<Option<transport>>)
//!         |
//!         v
//!  Connector -> EslConnection (TCP)
//!         |
//!         v
//!    EslEvent (Parser) -> reply payload -> ParsedReply
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use fsapi_esl::{Command, CommandChannel, EslSession, TcpConnector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = TcpConnector::new("localhost:8021", "ClueCon", Duration::from_secs(5));
//!     let session = EslSession::new(Box::new(connector));
//!
//!     let status = session.send(Command::bare("status")).await?;
//!     println!("{}", status);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod connection;
pub mod error;
pub mod event;
pub mod reply;
pub mod session;

pub use command::Command;
pub use connection::{EslConnection, TcpConnector};
pub use error::EslError;
pub use event::EslEvent;
pub use reply::{ParsedReply, ReplyShape, Row};
pub use session::{CommandChannel, Connector, EslSession, EslTransport};

/// ESL protocol constants
pub mod constants {
    /// Authentication command
    pub const AUTH_COMMAND: &str = "auth";

    /// API command prefix
    pub const API_COMMAND: &str = "api";

    /// Command/Reply content type
    pub const CONTENT_TYPE_REPLY: &str = "command/reply";

    /// API response content type
    pub const CONTENT_TYPE_API_RESPONSE: &str = "api/response";

    /// Authentication request content type
    pub const CONTENT_TYPE_AUTH: &str = "auth/request";

    /// Sent by the switch right before it closes the socket
    pub const CONTENT_TYPE_DISCONNECT: &str = "text/disconnect-notice";

    /// Success marker at the start of a reply
    pub const ACK_PREFIX: &str = "+OK";

    /// Prefixes marking a rejected command
    pub const ERROR_MARKERS: &[&str] = &["-ERR", "-USAGE"];

    /// Command timeout in seconds
    pub const COMMAND_TIMEOUT_SECS: u64 = 10;
}
