//! `pipegate-server` — webhook receiver for pipeline lifecycle events.
//!
//! A thin HTTP surface over [`pipegate_core::router::EventRouter`]: one
//! POST endpoint that authenticates, parses, and routes each delivered
//! event, and a liveness probe. All decision logic lives in the core crate.

pub mod routes;
pub mod signature;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use pipegate_core::config::GateConfig;
use pipegate_core::router::EventRouter;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/events", post(routes::events::receive_event))
        .route("/healthz", get(routes::events::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the webhook server on `port`.
pub async fn serve(config: GateConfig, port: u16) -> anyhow::Result<()> {
    let webhook_secret = config.webhook.secret.clone();
    let router = Arc::new(EventRouter::from_config(Arc::new(config))?);
    let app = build_router(AppState::new(router, webhook_secret));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("pipegate webhook listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
