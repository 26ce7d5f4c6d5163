//! fsapi server
//!
//! Multi-tenant REST control surface for FreeSWITCH. Every API call is
//! translated into an `api` command on one shared event socket connection.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use fsapi_api::{configure, configure_health, extractor_error_handlers};
use fsapi_auth::{assign_request_id, ApiTokens};
use fsapi_core::{AppConfig, VERSION};
use fsapi_esl::{CommandChannel, EslSession, TcpConnector};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `LOG_FORMAT=json` switches to structured JSON lines.
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fsapi={lvl},fsapi_api={lvl},fsapi_auth={lvl},fsapi_esl={lvl},fsapi_core={lvl},actix_web=info",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting fsapi v{}", VERSION);

    let config = AppConfig::load().context("Failed to load configuration")?;

    let tokens = config.auth.tokens();
    if tokens.is_empty() {
        warn!("No API tokens configured, bearer authentication is disabled");
    } else {
        info!("Bearer authentication enabled with {} token(s)", tokens.len());
    }

    // One lazily connected session shared by every worker
    let connector = TcpConnector::new(
        config.esl.addr(),
        config.esl.password.clone(),
        config.esl.connect_timeout(),
    );
    let session = Arc::new(
        EslSession::new(Box::new(connector)).with_command_timeout(config.esl.command_timeout()),
    );
    info!(
        "ESL session configured for {} (command timeout {}s)",
        config.esl.addr(),
        config.esl.command_timeout_secs
    );

    let channel: Arc<dyn CommandChannel> = session.clone();
    let tokens = web::Data::new(ApiTokens::new(tokens));
    let max_body_bytes = config.server.max_body_bytes;

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            // Shared control channel and credentials
            .app_data(web::Data::from(channel.clone()))
            .app_data(tokens.clone())
            // Malformed input becomes a 400 envelope
            .configure(extractor_error_handlers(max_body_bytes))
            // Middleware; the last one wrapped runs first
            .wrap(middleware::from_fn(assign_request_id))
            .wrap(TracingLogger::default())
            // Routes
            .configure(configure_health)
            .configure(configure)
    })
    .workers(config.server.workers)
    .client_request_timeout(Duration::from_secs(config.server.request_timeout_secs))
    .keep_alive(Duration::from_secs(config.server.keep_alive_secs))
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("HTTP server stopped, closing ESL session");
    session.close().await;

    Ok(())
}
