//! Authentication and tenant authorization for fsapi
//!
//! Two independent gates run before a handler touches the switch:
//!
//! - Bearer tokens: a configured token list checked against the
//!   `Authorization` header; loopback peers and an empty list skip the check
//! - Tenant scope: the `X-Allowed-Contexts` header becomes a [`TenantScope`]
//!   that every entity is checked against through a [`TenantResolver`]
//!
//! Both are surfaced to handlers through the [`RequestContext`] extractor.
//!
//! ## Using the extractor in Actix-web
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use fsapi_auth::RequestContext;
//!
//! async fn handler(ctx: RequestContext) -> HttpResponse {
//!     HttpResponse::Ok().json(serde_json::json!({
//!         "request_id": ctx.request_id,
//!         "unrestricted": ctx.scope.is_unrestricted(),
//!     }))
//! }
//! ```

pub mod middleware;
pub mod resolver;
pub mod scope;

pub use middleware::{
    assign_request_id, ApiTokens, AssignedRequestId, RequestContext, REQUEST_ID_HEADER,
};
pub use resolver::{
    AgentResolver, CallResolver, QueueResolver, RegistrationResolver, TenantResolver,
    TierResolver,
};
pub use scope::{Subject, TenantScope, ALLOWED_CONTEXTS_HEADER, WILDCARD};
