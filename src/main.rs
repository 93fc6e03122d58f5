use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use consumer_metrics::{ConsumerMetrics, MetricsError};

mod handlers;
mod load_generator;
mod server;
mod settings;

use settings::ObservatoryConfig;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Metrics of the simulated consumer; handlers only read from it.
    pub metrics: Arc<ConsumerMetrics>,

    pub consumer_name: String,

    pub started_at: DateTime<Utc>,

    /// Flips to `true` once shutdown starts; long-lived streams end on it.
    pub shutdown: watch::Receiver<bool>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Metrics observatory exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MetricsError> {
    // ── 1. Configuration ─────────────────────────────────────────
    let config = ObservatoryConfig::load()?;
    config.validate()?;

    // ── 2. Emitter + metrics ─────────────────────────────────────
    let emitter = config.emitter.build().await?;
    let metrics = Arc::new(ConsumerMetrics::new(
        &config.consumer_name,
        emitter,
        &config.metrics,
    )?);

    // ── 3. Simulated consumer ────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let load_handle = tokio::spawn(load_generator::run(
        running.clone(),
        metrics.clone(),
        config.load.clone(),
    ));

    // ── 4. HTTP surface ──────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(AppState {
        metrics: metrics.clone(),
        consumer_name: config.consumer_name.clone(),
        started_at: Utc::now(),
        shutdown: shutdown_rx.clone(),
    });
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        consumer = %config.consumer_name,
        "Metrics observatory listening (GET /api/stats, /api/stats/stream, /api/health)"
    );

    tokio::spawn(async move {
        shutdown_signal().await;
        // Receivers only go away with the server itself
        let _ = shutdown_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(server::wait_for_shutdown(shutdown_rx))
        .await?;

    // ── 5. Shutdown: stop producers first, then reporting ────────
    running.store(false, Ordering::SeqCst);
    load_handle
        .await
        .map_err(|e| MetricsError::Join(e.to_string()))?;
    metrics.close().await?;

    tracing::info!("Metrics observatory stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
