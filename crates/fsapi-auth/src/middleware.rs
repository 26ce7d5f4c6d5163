//! Actix-web middleware and request extractors
//!
//! [`RequestContext`] is the only way handlers learn who is calling: it runs
//! the bearer-token check, derives the tenant scope and picks up the request
//! id assigned by [`assign_request_id`].

use crate::scope::{TenantScope, ALLOWED_CONTEXTS_HEADER};
use actix_web::{
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::{self, HeaderName, HeaderValue},
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use fsapi_core::ApiError;
use futures::future::{ready, Ready};
use tracing::{debug, warn};
use tracing_actix_web::RequestId;
use uuid::Uuid;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id chosen for the current request
#[derive(Debug, Clone)]
pub struct AssignedRequestId(pub String);

/// Pick the request id (reusing the one `TracingLogger` generated, if any),
/// expose it to extractors and echo it in `X-Request-ID`
pub async fn assign_request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut()
        .insert(AssignedRequestId(request_id.clone()));

    let mut res = next.call(req).await?;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    Ok(res)
}

/// Configured bearer tokens; empty means the API is open
#[derive(Debug, Clone, Default)]
pub struct ApiTokens(Vec<String>);

impl ApiTokens {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    pub fn accepts(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }
}

/// Check the `Authorization` header against the configured tokens
///
/// Loopback peers are trusted without a token.
fn authenticate(req: &HttpRequest) -> Result<(), ApiError> {
    if req.peer_addr().map_or(false, |addr| addr.ip().is_loopback()) {
        return Ok(());
    }

    let tokens = match req.app_data::<web::Data<ApiTokens>>() {
        Some(tokens) if !tokens.is_open() => tokens,
        _ => return Ok(()),
    };

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => value.to_str().unwrap_or_default(),
        None => {
            debug!("No Authorization header in request");
            return Err(ApiError::Unauthorized(
                "Missing Authorization header".to_string(),
            ));
        }
    };

    let token = match auth_header.split_once(' ') {
        Some(("Bearer", token)) => token,
        _ => {
            return Err(ApiError::Unauthorized(
                "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            ))
        }
    };

    if !tokens.accepts(token) {
        warn!(peer = ?req.peer_addr(), "Rejected invalid bearer token");
        return Err(ApiError::Unauthorized(
            "Invalid authentication token".to_string(),
        ));
    }

    Ok(())
}

/// Scope from the tenant header; an unreadable header allows nothing
fn scope_from_request(req: &HttpRequest) -> TenantScope {
    match req.headers().get(ALLOWED_CONTEXTS_HEADER) {
        None => TenantScope::from_header(None),
        Some(value) => match value.to_str() {
            Ok(value) => TenantScope::from_header(Some(value)),
            Err(_) => {
                warn!("Unreadable {} header, denying all tenants", ALLOWED_CONTEXTS_HEADER);
                TenantScope::Restricted(Default::default())
            }
        },
    }
}

/// Request-scoped state handed to every API handler
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use fsapi_auth::RequestContext;
///
/// async fn handler(ctx: RequestContext) -> HttpResponse {
///     if ctx.scope.is_allowed("acme.com") {
///         HttpResponse::Ok().finish()
///     } else {
///         HttpResponse::Forbidden().finish()
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Id echoed back in `X-Request-ID`
    pub request_id: String,

    /// Tenants this request may see and act on
    pub scope: TenantScope,
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Err(e) = authenticate(req) {
            return ready(Err(e));
        }

        let request_id = {
            let extensions = req.extensions();
            match extensions.get::<AssignedRequestId>() {
                Some(assigned) => assigned.0.clone(),
                None => extensions
                    .get::<RequestId>()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            }
        };

        let scope = scope_from_request(req);
        debug!(
            request_id = %request_id,
            unrestricted = scope.is_unrestricted(),
            "Request context resolved"
        );

        ready(Ok(RequestContext { request_id, scope }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{middleware::from_fn, test, App, HttpResponse};
    use std::net::SocketAddr;

    async fn echo_scope(ctx: RequestContext) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({
            "request_id": ctx.request_id,
            "allowed": ctx.scope.allowed_list(),
        }))
    }

    fn remote() -> SocketAddr {
        "203.0.113.7:40000".parse().unwrap()
    }

    fn tokens(list: &[&str]) -> web::Data<ApiTokens> {
        web::Data::new(ApiTokens::new(list.iter().map(|t| t.to_string()).collect()))
    }

    #[actix_web::test]
    async fn test_scope_and_request_id() {
        let app = test::init_service(
            App::new().route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .insert_header((ALLOWED_CONTEXTS_HEADER, "b.com, a.com"))
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["allowed"], "a.com, b.com");
        assert!(Uuid::parse_str(body["request_id"].as_str().unwrap()).is_ok());
    }

    #[actix_web::test]
    async fn test_request_id_is_echoed() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(assign_request_id))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get().uri("/test").to_request();
        let resp = test::call_service(&app, req).await;
        let header = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["request_id"], header.as_str());
    }

    #[actix_web::test]
    async fn test_request_id_on_rejected_request() {
        let app = test::init_service(
            App::new()
                .app_data(tokens(&["secret"]))
                .wrap(from_fn(assign_request_id))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[actix_web::test]
    async fn test_valid_bearer_token() {
        let app = test::init_service(
            App::new()
                .app_data(tokens(&["secret"]))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .insert_header(("Authorization", "Bearer secret"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_missing_and_invalid_tokens() {
        let app = test::init_service(
            App::new()
                .app_data(tokens(&["secret"]))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        assert_eq!(resp.headers().get("WWW-Authenticate").unwrap(), "Bearer");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing Authorization header");

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .insert_header(("Authorization", "Basic c2VjcmV0"))
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(
            body["message"],
            "Invalid Authorization header format. Expected: Bearer <token>"
        );

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .insert_header(("Authorization", "Bearer wrong"))
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "Invalid authentication token");
    }

    #[actix_web::test]
    async fn test_loopback_bypasses_token_check() {
        let app = test::init_service(
            App::new()
                .app_data(tokens(&["secret"]))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr("127.0.0.1:5000".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_no_tokens_configured_is_open() {
        let app = test::init_service(
            App::new()
                .app_data(tokens(&[]))
                .route("/test", web::get().to(echo_scope)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/test")
            .peer_addr(remote())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_api_tokens() {
        let tokens = ApiTokens::new(vec!["a".into(), "b".into()]);
        assert!(tokens.accepts("b"));
        assert!(!tokens.accepts("c"));
        assert!(!tokens.is_open());
        assert!(ApiTokens::default().is_open());
    }
}
