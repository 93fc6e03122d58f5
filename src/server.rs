use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::AppState;

/// Builds the Axum `Router` exposing the consumer's statistics.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Stats query ─────────────────────────────────────────
        .route("/api/stats", get(handlers::stats::get_stats))
        .route("/api/stats/stream", get(handlers::stats::stats_stream))
        // ── Health check ────────────────────────────────────────
        .route("/api/health", get(handlers::health::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Resolves once shutdown has been requested, or once the sender is gone.
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
