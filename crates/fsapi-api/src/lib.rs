//! API layer for fsapi
//!
//! HTTP handlers translating REST calls into switch commands. Every handler
//! follows the same pipeline: validate the input, resolve the tenant of the
//! target entity, authorize it against the caller's scope, build the
//! command, send it over the shared [`fsapi_esl::CommandChannel`] and map
//! the reply into a JSON envelope.

#![forbid(unsafe_code)]

pub mod commands;
pub mod dto;
pub mod handlers;

pub use dto::{CountResponse, DataResponse, ListResponse, MessageResponse};
pub use handlers::{configure, configure_health, extractor_error_handlers};
