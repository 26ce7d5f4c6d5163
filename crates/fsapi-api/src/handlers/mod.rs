//! HTTP request handlers

pub mod callcenter;
pub mod calls;
pub mod registrations;
pub mod status;

use crate::commands;
use actix_web::web;
use fsapi_auth::{RequestContext, Subject, TenantResolver};
use fsapi_core::{ApiError, ApiResult};
use fsapi_esl::{Command, CommandChannel, EslError, ParsedReply, ReplyShape, Row};
use tracing::debug;

pub use callcenter::configure as configure_callcenter;
pub use calls::configure as configure_calls;
pub use registrations::configure as configure_registrations;

/// Mount every `/v1` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .route("/status", web::get().to(status::get_status))
            .configure(configure_calls)
            .configure(configure_callcenter)
            .configure(configure_registrations),
    );
}

/// Mount the unauthenticated liveness probe
pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(status::health));
}

/// Extractor settings turning malformed input into `400` envelopes
pub fn extractor_error_handlers(max_body_bytes: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(
            web::JsonConfig::default()
                .limit(max_body_bytes)
                .error_handler(|err, _req| {
                    debug!(error = %err, "Rejected request body");
                    ApiError::Validation("Invalid request body".to_string()).into()
                }),
        )
        .app_data(web::PathConfig::default().error_handler(|err, _req| {
            debug!(error = %err, "Rejected path parameters");
            ApiError::Validation(format!("Invalid path parameter: {}", err)).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            debug!(error = %err, "Rejected query string");
            ApiError::Validation(format!("Invalid query parameters: {}", err)).into()
        }));
    }
}

// ==================== Reply Mapping ====================

/// Maps channel failures onto HTTP errors
pub(crate) trait EslResultExt<T> {
    /// `-ERR` replies become 502, everything else 503
    fn or_fail(self, action: &str) -> ApiResult<T>;
}

impl<T> EslResultExt<T> for Result<T, EslError> {
    fn or_fail(self, action: &str) -> ApiResult<T> {
        self.map_err(|e| {
            let message = format!("Failed to {}: {}", action, e);
            if e.is_remote() {
                ApiError::EslCommand(message)
            } else {
                ApiError::EslConnection(message)
            }
        })
    }
}

/// Send one command and map a failure to `Failed to <action>: ...`
pub(crate) async fn send(
    channel: &dyn CommandChannel,
    command: Command,
    action: &str,
) -> ApiResult<String> {
    debug!(command = %command, "Dispatching command");
    channel.send(command).await.or_fail(action)
}

/// Interpret a reply as rows
pub(crate) fn rows_of(raw: &str, shape: ReplyShape, what: &str) -> ApiResult<Vec<Row>> {
    match ParsedReply::parse(raw, shape) {
        ParsedReply::TableRows(rows) => Ok(rows),
        ParsedReply::ParseFailure(e) => Err(ApiError::UpstreamFormat(format!(
            "Failed to parse {}: {}",
            what, e
        ))),
        other => Err(ApiError::UpstreamFormat(format!(
            "Unexpected {} reply: {:?}",
            what, other
        ))),
    }
}

/// Interpret a reply as a plain counter
pub(crate) fn count_of(raw: &str, what: &str) -> ApiResult<i64> {
    match ParsedReply::parse(raw, ReplyShape::Counter) {
        ParsedReply::Counter(n) => Ok(n),
        ParsedReply::ParseFailure(e) => Err(ApiError::UpstreamFormat(format!(
            "Failed to parse {}: {}",
            what, e
        ))),
        other => Err(ApiError::UpstreamFormat(format!(
            "Unexpected {} reply: {:?}",
            what, other
        ))),
    }
}

/// Rows for a listing, narrowed to the caller's tenants
pub(crate) async fn filtered_rows(
    channel: &dyn CommandChannel,
    ctx: &RequestContext,
    command: Command,
    shape: ReplyShape,
    resolver: &dyn TenantResolver,
    what: &str,
) -> ApiResult<Vec<Row>> {
    let raw = send(channel, command, &format!("list {}", what)).await?;
    let rows = rows_of(&raw, shape, what)?;
    let total = rows.len();

    let rows = ctx.scope.filter_rows(rows, resolver);
    debug!(
        request_id = %ctx.request_id,
        total = total,
        visible = rows.len(),
        "Listed {}",
        what
    );
    Ok(rows)
}

// ==================== Call Lookup ====================

/// A live call located by either leg
#[derive(Debug, Clone)]
pub(crate) struct LocatedCall {
    pub row: Row,
}

impl LocatedCall {
    pub fn aleg(&self) -> &str {
        self.row.get("uuid").map(String::as_str).unwrap_or("")
    }

    pub fn bleg(&self) -> &str {
        self.row.get("b_uuid").map(String::as_str).unwrap_or("")
    }

    pub fn tenant(&self) -> String {
        fsapi_auth::CallResolver.resolve(&self.row)
    }
}

/// Find the call owning `uuid` and authorize it
///
/// A miss is `404` for every scope, and is reported before any `403`.
pub(crate) async fn authorize_call(
    channel: &dyn CommandChannel,
    ctx: &RequestContext,
    uuid: &str,
) -> ApiResult<LocatedCall> {
    let raw = send(channel, commands::show_calls(), "verify call").await?;
    let rows = rows_of(&raw, ReplyShape::JsonRows, "call list")?;

    let row = rows
        .into_iter()
        .find(|row| {
            row.get("uuid").map(String::as_str) == Some(uuid)
                || row.get("b_uuid").map(String::as_str) == Some(uuid)
        })
        .ok_or_else(|| ApiError::NotFound(format!("Call {} not found", uuid)))?;

    let call = LocatedCall { row };
    ctx.scope.require_allowed(&call.tenant(), Subject::Call(uuid))?;
    Ok(call)
}
