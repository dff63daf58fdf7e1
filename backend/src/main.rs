use dotenvy::dotenv;
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
    http::HeaderValue,
};
use tower_http::cors::{CorsLayer, AllowOrigin};
use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnResponse};
use tracing::Level;
use std::sync::Arc;
use std::time::Duration;
use sentry;
mod handlers {
    pub mod lead_handlers;
    pub mod page_routes;
}
mod utils {
    pub mod email_templates;
    pub mod lead_dedup;
    pub mod notification_utils;
}
mod api {
    pub mod mailer;
}
mod config;
mod error;
mod models {
    pub mod lead_models;
}
#[cfg(test)]
mod test_support;
use api::mailer::Mailer;
use config::Config;
use handlers::{lead_handlers, page_routes};
use utils::lead_dedup::LeadDedup;
async fn health_check() -> &'static str {
    "OK"
}
const DEDUP_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub struct AppState {
    config: Config,
    mailer: Arc<dyn Mailer>,
    lead_dedup: LeadDedup, // per-process, see LeadDedup docs
}
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let frontend_origin: HeaderValue = state
        .config
        .frontend_url
        .parse()
        .with_context(|| format!("Invalid FRONTEND_URL: {}", state.config.frontend_url))?;
    // Public routes, both hit by anonymous visitors
    let lead_routes = Router::new()
        .route("/api/lead/save", post(lead_handlers::save_lead))
        .route("/api/lead/abandon", post(lead_handlers::abandon_beacon));
    let app = Router::new()
        .route("/api/health", get(health_check))
        .merge(lead_routes)
        .merge(page_routes::landing_pages(&state.config.static_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
        )
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
                .allow_origin(AllowOrigin::exact(frontend_origin))
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                ])
        )
        .with_state(state);
    Ok(app)
}
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;
    let dsn = config
        .sentry_dsn
        .as_deref()
        .map(str::parse::<sentry::types::Dsn>)
        .transpose()
        .context("SENTRY_DSN is invalid")?;
    let _guard = sentry::init(sentry::ClientOptions {
        dsn,
        release: sentry::release_name!(),
        ..Default::default()
    });
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if config.is_development() {
                EnvFilter::new("debug,hyper=info")
            } else {
                EnvFilter::new("info,edge_site=debug")
            }
        });
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
    let mailer = api::mailer::build_mailer(&config.mail_backend)
        .context("Failed to set up the email provider")?;
    let port = config.port;
    let state = Arc::new(AppState {
        lead_dedup: LeadDedup::new(config.lead_notify.dedup_ttl),
        mailer,
        config,
    });
    let app = build_router(state.clone())?;
    let state_for_purge = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DEDUP_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = state_for_purge.lead_dedup.purge_expired();
            if purged > 0 {
                tracing::debug!(
                    "Purged {} expired lead dedup entries, {} remain",
                    purged,
                    state_for_purge.lead_dedup.len()
                );
            }
        }
    });
    use tokio::net::TcpListener;
    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
