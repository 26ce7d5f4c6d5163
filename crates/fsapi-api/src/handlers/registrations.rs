//! SIP registration listing

use super::filtered_rows;
use crate::commands;
use crate::dto::ListResponse;
use actix_web::{web, HttpResponse};
use fsapi_auth::{RegistrationResolver, RequestContext};
use fsapi_core::ApiResult;
use fsapi_esl::{CommandChannel, ReplyShape};
use tracing::instrument;

/// Registrations whose `realm` is in scope
///
/// GET /v1/registrations
#[instrument(skip(channel, ctx))]
pub async fn list_registrations(
    channel: web::Data<dyn CommandChannel>,
    ctx: RequestContext,
) -> ApiResult<HttpResponse> {
    let rows = filtered_rows(
        channel.get_ref(),
        &ctx,
        commands::show_registrations(),
        ReplyShape::JsonRows,
        &RegistrationResolver,
        "registrations",
    )
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::success(rows)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/registrations", web::get().to(list_registrations));
}
