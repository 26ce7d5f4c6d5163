//! Switch status and liveness

use super::send;
use crate::commands;
use crate::dto::DataResponse;
use actix_web::{web, HttpResponse};
use fsapi_auth::RequestContext;
use fsapi_core::{ApiError, ApiResult, VERSION};
use fsapi_esl::CommandChannel;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

/// Structured switch status, unwrapped from the `json` API envelope
///
/// GET /v1/status
#[instrument(skip(channel, ctx))]
pub async fn get_status(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let raw = send(
        channel.get_ref(),
        commands::status_json(),
        "get FreeSWITCH status",
    )
    .await?;

    let mut envelope: Value = serde_json::from_str(raw.trim()).map_err(|e| {
        ApiError::UpstreamFormat(format!("Failed to parse FreeSWITCH JSON response: {}", e))
    })?;

    let data = envelope
        .get_mut("response")
        .map(Value::take)
        .ok_or_else(|| {
            ApiError::UpstreamFormat("FreeSWITCH response missing 'response' field".to_string())
        })?;

    info!(request_id = %ctx.request_id, "FreeSWITCH status retrieved");
    Ok(HttpResponse::Ok().json(DataResponse::success(data)))
}

/// Liveness probe: a plain `status` round trip
///
/// GET /health
#[instrument(skip(channel))]
pub async fn health(channel: web::Data<dyn CommandChannel>) -> HttpResponse {
    match channel.send(commands::status()).await {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "version": VERSION,
        })),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy",
                "error": "ESL connection unavailable",
                "version": VERSION,
            }))
        }
    }
}
