//! mod_callcenter handlers
//!
//! Queues and tiers carry their tenant in a `name@tenant` queue name. Agent
//! listings derive it from the `domain_name=` token of the agent contact;
//! agent writes take it from the request body, where it is mandatory for
//! restricted callers.

use super::{count_of, filtered_rows, rows_of, send};
use crate::commands::{self, QueueAction, QueueListing};
use crate::dto::{
    AgentAddRequest, AgentCountQuery, AgentDeleteRequest, AgentSetRequest, Checked,
    CountResponse, ListResponse, MessageResponse, TierAddRequest, TierDeleteRequest,
    TierSetRequest, AGENT_SET_KEYS, AGENT_TYPES, TIER_SET_KEYS,
};
use actix_web::{web, HttpResponse};
use fsapi_auth::resolver::domain_suffix;
use fsapi_auth::{AgentResolver, QueueResolver, RequestContext, Subject, TierResolver};
use fsapi_core::{ApiError, ApiResult};
use fsapi_esl::{CommandChannel, ReplyShape};
use tracing::{info, instrument};

fn success(ctx: &RequestContext, message: String) -> HttpResponse {
    info!(request_id = %ctx.request_id, "{}", message);
    HttpResponse::Ok().json(MessageResponse::success(message))
}

/// Validate a queue name and check its tenant
fn authorize_queue(ctx: &RequestContext, queue: &str) -> ApiResult<()> {
    commands::validate_token("queue", queue)?;
    ctx.scope.require_allowed(
        domain_suffix(queue),
        Subject::Named {
            kind: "Queue",
            name: queue,
        },
    )
}

/// Check the body-supplied domain of an agent write
fn authorize_agent_domain(ctx: &RequestContext, domain: &str) -> ApiResult<()> {
    if domain.is_empty() {
        if ctx.scope.is_unrestricted() {
            return Ok(());
        }
        return Err(ApiError::Validation(
            "domain is required for authorization".to_string(),
        ));
    }
    ctx.scope
        .require_allowed(domain, Subject::Domain { kind: "Agent" })
}

// ==================== Queues ====================

/// GET /v1/callcenter/queues
#[instrument(skip(channel, ctx))]
pub async fn list_queues(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let rows = filtered_rows(
        channel.get_ref(),
        &ctx,
        commands::queue_list(),
        ReplyShape::Table,
        &QueueResolver,
        "queues",
    )
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

/// Native count when unrestricted, otherwise list, filter and count
///
/// GET /v1/callcenter/queues/count
#[instrument(skip(channel, ctx))]
pub async fn count_queues(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let count = if ctx.scope.is_unrestricted() {
        let raw = send(channel.get_ref(), commands::queue_count(), "count queues").await?;
        count_of(&raw, "queue count")?
    } else {
        let rows = filtered_rows(
            channel.get_ref(),
            &ctx,
            commands::queue_list(),
            ReplyShape::Table,
            &QueueResolver,
            "queues",
        )
        .await?;
        rows.len() as i64
    };

    Ok(HttpResponse::Ok().json(CountResponse::success(count)))
}

async fn list_of_queue(
    channel: &dyn CommandChannel,
    ctx: &RequestContext,
    queue: &str,
    listing: QueueListing,
) -> ApiResult<HttpResponse> {
    authorize_queue(ctx, queue)?;

    let what = format!("queue {}", listing.as_str());
    let raw = send(
        channel,
        commands::queue_list_of(listing, queue),
        &format!("list {}", what),
    )
    .await?;
    let rows = rows_of(&raw, ReplyShape::Table, &what)?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

async fn count_of_queue(
    channel: &dyn CommandChannel,
    ctx: &RequestContext,
    queue: &str,
    listing: QueueListing,
    status: Option<&str>,
) -> ApiResult<HttpResponse> {
    authorize_queue(ctx, queue)?;
    if let Some(status) = status {
        commands::validate_token("status", status)?;
    }

    let what = format!("queue {}", listing.as_str());
    let raw = send(
        channel,
        commands::queue_count_of(listing, queue, status),
        &format!("count {}", what),
    )
    .await?;
    let count = count_of(&raw, &format!("{} count", what))?;

    Ok(HttpResponse::Ok().json(CountResponse::success(count)))
}

/// GET /v1/callcenter/queues/{queue}/agents
#[instrument(skip(channel, ctx))]
pub async fn list_queue_agents(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    list_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Agents).await
}

/// GET /v1/callcenter/queues/{queue}/members
#[instrument(skip(channel, ctx))]
pub async fn list_queue_members(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    list_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Members).await
}

/// GET /v1/callcenter/queues/{queue}/tiers
#[instrument(skip(channel, ctx))]
pub async fn list_queue_tiers(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    list_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Tiers).await
}

/// GET /v1/callcenter/queues/{queue}/agents/count?status=
#[instrument(skip(channel, ctx))]
pub async fn count_queue_agents(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    query: web::Query<AgentCountQuery>,
) -> ApiResult<HttpResponse> {
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    count_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Agents, status).await
}

/// GET /v1/callcenter/queues/{queue}/members/count
#[instrument(skip(channel, ctx))]
pub async fn count_queue_members(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    count_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Members, None).await
}

/// GET /v1/callcenter/queues/{queue}/tiers/count
#[instrument(skip(channel, ctx))]
pub async fn count_queue_tiers(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    count_of_queue(channel.get_ref(), &ctx, &path, QueueListing::Tiers, None).await
}

async fn queue_lifecycle(
    channel: &dyn CommandChannel,
    ctx: &RequestContext,
    queue: &str,
    action: QueueAction,
) -> ApiResult<HttpResponse> {
    authorize_queue(ctx, queue)?;

    send(
        channel,
        commands::queue_action(action, queue),
        &format!("{} queue", action.as_str()),
    )
    .await?;

    Ok(success(
        ctx,
        format!("Queue {} {}", queue, action.past_tense()),
    ))
}

/// POST /v1/callcenter/queues/{queue}/load
#[instrument(skip(channel, ctx))]
pub async fn load_queue(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    queue_lifecycle(channel.get_ref(), &ctx, &path, QueueAction::Load).await
}

/// POST /v1/callcenter/queues/{queue}/unload
#[instrument(skip(channel, ctx))]
pub async fn unload_queue(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    queue_lifecycle(channel.get_ref(), &ctx, &path, QueueAction::Unload).await
}

/// POST /v1/callcenter/queues/{queue}/reload
#[instrument(skip(channel, ctx))]
pub async fn reload_queue(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    queue_lifecycle(channel.get_ref(), &ctx, &path, QueueAction::Reload).await
}

// ==================== Agents ====================

/// GET /v1/callcenter/agents
#[instrument(skip(channel, ctx))]
pub async fn list_agents(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let rows = filtered_rows(
        channel.get_ref(),
        &ctx,
        commands::agent_list(),
        ReplyShape::Table,
        &AgentResolver,
        "agents",
    )
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

/// POST /v1/callcenter/agents
#[instrument(skip(channel, ctx, req))]
pub async fn add_agent(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<AgentAddRequest>,
) -> ApiResult<HttpResponse> {
    req.check()?;
    if !AGENT_TYPES.contains(&req.agent_type.as_str()) {
        return Err(ApiError::Validation(
            "type must be 'callback' or 'uuid-standby'".to_string(),
        ));
    }
    commands::validate_token("name", &req.name)?;
    authorize_agent_domain(&ctx, &req.domain)?;

    send(
        channel.get_ref(),
        commands::agent_add(&req.name, &req.agent_type),
        "add agent",
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Agent {} added with type {}", req.name, req.agent_type),
    ))
}

/// Restricted callers must send `{"domain": ...}`; the body is optional otherwise
///
/// DELETE /v1/callcenter/agents/{agent}
#[instrument(skip(channel, ctx, body))]
pub async fn delete_agent(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    body: Option<web::Json<AgentDeleteRequest>>,
) -> ApiResult<HttpResponse> {
    let agent = path.into_inner();
    commands::validate_token("agent", &agent)?;

    let req = match body {
        Some(body) => body.into_inner(),
        None if ctx.scope.is_unrestricted() => AgentDeleteRequest::default(),
        None => {
            return Err(ApiError::Validation(
                "Invalid request body: domain is required for authorization".to_string(),
            ))
        }
    };
    authorize_agent_domain(&ctx, &req.domain)?;

    send(channel.get_ref(), commands::agent_del(&agent), "delete agent").await?;

    Ok(success(&ctx, format!("Agent {} deleted", agent)))
}

/// PUT /v1/callcenter/agents/{agent}
#[instrument(skip(channel, ctx, req))]
pub async fn set_agent(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<AgentSetRequest>,
) -> ApiResult<HttpResponse> {
    let agent = path.into_inner();
    commands::validate_token("agent", &agent)?;
    req.check()?;
    if !AGENT_SET_KEYS.contains(&req.key.as_str()) {
        return Err(ApiError::Validation(format!(
            "invalid key '{}': must be one of: {}",
            req.key,
            AGENT_SET_KEYS.join(", ")
        )));
    }
    commands::validate_quoted("value", &req.value)?;
    authorize_agent_domain(&ctx, &req.domain)?;

    send(
        channel.get_ref(),
        commands::agent_set(&req.key, &agent, &req.value),
        &format!("set agent {}", req.key),
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Agent {} {} set to '{}'", agent, req.key, req.value),
    ))
}

// ==================== Tiers ====================

/// GET /v1/callcenter/tiers
#[instrument(skip(channel, ctx))]
pub async fn list_tiers(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let rows = filtered_rows(
        channel.get_ref(),
        &ctx,
        commands::tier_list(),
        ReplyShape::Table,
        &TierResolver,
        "tiers",
    )
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

/// POST /v1/callcenter/tiers
#[instrument(skip(channel, ctx, req))]
pub async fn add_tier(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<TierAddRequest>,
) -> ApiResult<HttpResponse> {
    req.check()?;
    commands::validate_token("agent", &req.agent)?;
    commands::validate_token("level", &req.level)?;
    commands::validate_token("position", &req.position)?;
    authorize_queue(&ctx, &req.queue)?;

    send(
        channel.get_ref(),
        commands::tier_add(&req.queue, &req.agent, &req.level, &req.position),
        "add tier",
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Tier added: agent {} to queue {}", req.agent, req.queue),
    ))
}

/// DELETE /v1/callcenter/tiers
#[instrument(skip(channel, ctx, req))]
pub async fn delete_tier(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<TierDeleteRequest>,
) -> ApiResult<HttpResponse> {
    req.check()?;
    commands::validate_token("agent", &req.agent)?;
    authorize_queue(&ctx, &req.queue)?;

    send(
        channel.get_ref(),
        commands::tier_del(&req.queue, &req.agent),
        "delete tier",
    )
    .await?;

    Ok(success(
        &ctx,
        format!("Tier deleted: agent {} from queue {}", req.agent, req.queue),
    ))
}

/// PUT /v1/callcenter/tiers
#[instrument(skip(channel, ctx, req))]
pub async fn set_tier(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
    req: web::Json<TierSetRequest>,
) -> ApiResult<HttpResponse> {
    req.check()?;
    if !TIER_SET_KEYS.contains(&req.key.as_str()) {
        return Err(ApiError::Validation(format!(
            "invalid key '{}': must be one of: {}",
            req.key,
            TIER_SET_KEYS.join(", ")
        )));
    }
    commands::validate_token("agent", &req.agent)?;
    commands::validate_quoted("value", &req.value)?;
    authorize_queue(&ctx, &req.queue)?;

    send(
        channel.get_ref(),
        commands::tier_set(&req.key, &req.queue, &req.agent, &req.value),
        &format!("set tier {}", req.key),
    )
    .await?;

    Ok(success(
        &ctx,
        format!(
            "Tier {} set to '{}' for agent {} in queue {}",
            req.key, req.value, req.agent, req.queue
        ),
    ))
}

/// Configure callcenter routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/callcenter")
            .route("/queues", web::get().to(list_queues))
            .route("/queues/count", web::get().to(count_queues))
            .route("/queues/{queue}/agents", web::get().to(list_queue_agents))
            .route("/queues/{queue}/agents/count", web::get().to(count_queue_agents))
            .route("/queues/{queue}/members", web::get().to(list_queue_members))
            .route("/queues/{queue}/members/count", web::get().to(count_queue_members))
            .route("/queues/{queue}/tiers", web::get().to(list_queue_tiers))
            .route("/queues/{queue}/tiers/count", web::get().to(count_queue_tiers))
            .route("/queues/{queue}/load", web::post().to(load_queue))
            .route("/queues/{queue}/unload", web::post().to(unload_queue))
            .route("/queues/{queue}/reload", web::post().to(reload_queue))
            .route("/agents", web::get().to(list_agents))
            .route("/agents", web::post().to(add_agent))
            .route("/agents/{agent}", web::put().to(set_agent))
            .route("/agents/{agent}", web::delete().to(delete_agent))
            .route("/tiers", web::get().to(list_tiers))
            .route("/tiers", web::post().to(add_tier))
            .route("/tiers", web::put().to(set_tier))
            .route("/tiers", web::delete().to(delete_tier)),
    );
}
