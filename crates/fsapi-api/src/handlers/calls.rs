//! Call control handlers
//!
//! Every handler that targets an existing call validates its input first,
//! then locates the call in `show calls as json` and authorizes its
//! `accountcode` before anything is sent to the switch.

use super::{authorize_call, filtered_rows, send};
use crate::commands::{self, Leg, DEFAULT_DTMF_DURATION_MS, DEFAULT_HANGUP_CAUSE};
use crate::dto::{
    BridgeRequest, CallDetailsResponse, Checked, DataResponse, DtmfRequest, HangupRequest,
    HoldRequest, LegDetails, ListResponse, MessageResponse, OriginateRequest, RecordRequest,
    TransferRequest, STATUS_SUCCESS,
};
use actix_web::{web, HttpResponse};
use fsapi_auth::{CallResolver, RequestContext, Subject};
use fsapi_core::{ApiError, ApiResult};
use fsapi_esl::{CommandChannel, ReplyShape};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

fn success(ctx: &RequestContext, message: String) -> HttpResponse {
    info!(request_id = %ctx.request_id, "{}", message);
    HttpResponse::Ok().json(MessageResponse::success(message))
}

fn call_uuid(path: web::Path<String>) -> ApiResult<String> {
    let uuid = path.into_inner();
    commands::validate_uuid(&uuid)?;
    Ok(uuid)
}

// ==================== Queries ====================

/// List live calls visible to the caller
///
/// GET /v1/calls
#[instrument(skip(channel, ctx))]
pub async fn list_calls(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let rows = filtered_rows(
        channel.get_ref(),
        &ctx,
        commands::show_calls(),
        ReplyShape::JsonRows,
        &CallResolver,
        "calls",
    )
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

/// Call row plus a detail dump of each leg
///
/// GET /v1/calls/{uuid}
#[instrument(skip(channel, ctx))]
pub async fn get_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    let channel = channel.get_ref();
    let call = authorize_call(channel, &ctx, &uuid).await?;

    let aleg_uuid = call.aleg().to_string();
    let raw = send(
        channel,
        commands::uuid_dump(&aleg_uuid),
        "retrieve A-leg details",
    )
    .await?;
    let aleg_details: Value = serde_json::from_str(raw.trim()).map_err(|e| {
        ApiError::UpstreamFormat(format!("Failed to parse A-leg details: {}", e))
    })?;

    let bleg_uuid = call.bleg().to_string();
    let bleg = if bleg_uuid.is_empty() {
        None
    } else {
        let details = match channel.send(commands::uuid_dump(&bleg_uuid)).await {
            Ok(raw) => match serde_json::from_str::<Value>(raw.trim()) {
                Ok(details) => Some(details),
                Err(e) => {
                    warn!(request_id = %ctx.request_id, bleg = %bleg_uuid, "Failed to parse B-leg details: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!(request_id = %ctx.request_id, bleg = %bleg_uuid, "Failed to retrieve B-leg details: {}", e);
                None
            }
        };
        Some(LegDetails {
            uuid: bleg_uuid,
            details,
        })
    };

    info!(request_id = %ctx.request_id, call_uuid = %uuid, "Call details retrieved");

    Ok(HttpResponse::Ok().json(CallDetailsResponse {
        status: STATUS_SUCCESS,
        call_info: call.row,
        aleg: LegDetails {
            uuid: aleg_uuid,
            details: Some(aleg_details),
        },
        bleg,
    }))
}

// ==================== Call Control ====================

/// Hang up a call; the body and its `cause` are optional
///
/// POST /v1/calls/{uuid}/hangup
#[instrument(skip(channel, ctx, body))]
pub async fn hangup_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    body: Option<web::Json<HangupRequest>>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let cause = if req.cause.is_empty() {
        DEFAULT_HANGUP_CAUSE.to_string()
    } else {
        req.cause
    };
    commands::validate_token("cause", &cause)?;

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(channel.get_ref(), commands::hangup(&uuid, &cause), "hangup call").await?;

    Ok(success(
        &ctx,
        format!("Call {} hung up with cause {}", uuid, cause),
    ))
}

/// POST /v1/calls/{uuid}/transfer
#[instrument(skip(channel, ctx, req))]
pub async fn transfer_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<TransferRequest>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    req.check()?;
    let leg = Leg::parse(&req.leg).ok_or_else(|| {
        ApiError::Validation("leg must be 'aleg', 'bleg', or 'both'".to_string())
    })?;
    commands::validate_token("destination", &req.destination)?;
    commands::validate_token("dialplan", &req.dialplan)?;
    commands::validate_token("context", &req.context)?;

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(
        channel.get_ref(),
        commands::transfer(&uuid, leg, &req.destination, &req.dialplan, &req.context),
        "transfer call",
    )
    .await?;

    let mut message = format!(
        "Call {} ({}) transferred to {}",
        uuid,
        leg.label(),
        req.destination
    );
    if !req.dialplan.is_empty() {
        message.push_str(&format!(" dialplan {}", req.dialplan));
    }
    if !req.context.is_empty() {
        message.push_str(&format!(" context {}", req.context));
    }

    Ok(success(&ctx, message))
}

/// Bridge two calls; both must be visible to the caller
///
/// POST /v1/calls/bridge
#[instrument(skip(channel, ctx, req))]
pub async fn bridge_calls(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<BridgeRequest>,
) -> ApiResult<HttpResponse> {
    if req.uuid_a.is_empty() || req.uuid_b.is_empty() {
        return Err(ApiError::Validation(
            "uuid_a and uuid_b are required".to_string(),
        ));
    }
    commands::validate_uuid(&req.uuid_a)
        .map_err(|e| ApiError::Validation(format!("uuid_a: {}", e)))?;
    commands::validate_uuid(&req.uuid_b)
        .map_err(|e| ApiError::Validation(format!("uuid_b: {}", e)))?;

    authorize_call(channel.get_ref(), &ctx, &req.uuid_a).await?;
    authorize_call(channel.get_ref(), &ctx, &req.uuid_b).await?;
    send(
        channel.get_ref(),
        commands::bridge(&req.uuid_a, &req.uuid_b),
        "bridge calls",
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Calls {} and {} bridged", req.uuid_a, req.uuid_b),
    ))
}

/// POST /v1/calls/{uuid}/answer
#[instrument(skip(channel, ctx))]
pub async fn answer_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(channel.get_ref(), commands::answer(&uuid), "answer call").await?;

    Ok(success(&ctx, format!("Call {} answered", uuid)))
}

/// POST /v1/calls/{uuid}/hold
#[instrument(skip(channel, ctx, req))]
pub async fn hold_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<HoldRequest>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    let on = match req.action.as_str() {
        "hold" => true,
        "unhold" => false,
        _ => {
            return Err(ApiError::Validation(
                "action must be 'hold' or 'unhold'".to_string(),
            ))
        }
    };

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(
        channel.get_ref(),
        commands::hold(&uuid, on),
        &format!("{} call", req.action),
    )
    .await?;

    Ok(success(&ctx, format!("Call {} {}", uuid, req.action)))
}

/// Start or stop recording
///
/// POST /v1/calls/{uuid}/record
#[instrument(skip(channel, ctx, req))]
pub async fn record_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<RecordRequest>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    let command = match req.action.as_str() {
        "start" => {
            if req.filename.is_empty() {
                return Err(ApiError::Validation(
                    "filename is required for start action".to_string(),
                ));
            }
            commands::validate_file_path(&req.filename)
                .map_err(|e| ApiError::Validation(format!("Invalid filename: {}", e)))?;
            commands::record_start(&uuid, &req.filename)
        }
        "stop" => commands::record_stop(&uuid),
        _ => {
            return Err(ApiError::Validation(
                "action must be 'start' or 'stop'".to_string(),
            ))
        }
    };

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(
        channel.get_ref(),
        command,
        &format!("{} recording", req.action),
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Recording {} for call {}", req.action, uuid),
    ))
}

/// POST /v1/calls/{uuid}/dtmf
#[instrument(skip(channel, ctx, req))]
pub async fn send_dtmf(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<DtmfRequest>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;
    req.check()?;
    commands::validate_token("digits", &req.digits)?;
    let duration = if req.duration == 0 {
        DEFAULT_DTMF_DURATION_MS
    } else {
        req.duration
    };

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(
        channel.get_ref(),
        commands::send_dtmf(&uuid, &req.digits, duration),
        "send DTMF",
    )
    .await?;

    Ok(success(
        &ctx,
        format!("DTMF {} sent to call {}", req.digits, uuid),
    ))
}

/// POST /v1/calls/{uuid}/park
#[instrument(skip(channel, ctx))]
pub async fn park_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let uuid = call_uuid(path)?;

    authorize_call(channel.get_ref(), &ctx, &uuid).await?;
    send(channel.get_ref(), commands::park(&uuid), "park call").await?;

    Ok(success(&ctx, format!("Call {} parked", uuid)))
}

/// Place a new call; a supplied `context` must be in scope
///
/// POST /v1/calls/originate
#[instrument(skip(channel, ctx, req))]
pub async fn originate_call(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<OriginateRequest>,
) -> ApiResult<HttpResponse> {
    req.check()?;
    commands::validate_originate(&req)?;

    if !req.context.is_empty() {
        ctx.scope.require_allowed(&req.context, Subject::Originate)?;
    }

    let raw = send(channel.get_ref(), commands::originate(&req), "originate call").await?;
    let response = raw.trim().to_string();

    info!(request_id = %ctx.request_id, aleg = %req.aleg, response = %response, "Call originated");

    Ok(HttpResponse::Ok().json(DataResponse::success(json!({ "response": response }))))
}

/// Configure call routes
///
/// Fixed paths are registered ahead of `/calls/{uuid}` so they are not
/// captured by the parameter.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/calls")
            .route("", web::get().to(list_calls))
            .route("/originate", web::post().to(originate_call))
            .route("/bridge", web::post().to(bridge_calls))
            .route("/{uuid}", web::get().to(get_call))
            .route("/{uuid}/hangup", web::post().to(hangup_call))
            .route("/{uuid}/transfer", web::post().to(transfer_call))
            .route("/{uuid}/answer", web::post().to(answer_call))
            .route("/{uuid}/hold", web::post().to(hold_call))
            .route("/{uuid}/record", web::post().to(record_call))
            .route("/{uuid}/dtmf", web::post().to(send_dtmf))
            .route("/{uuid}/park", web::post().to(park_call)),
    );
}
