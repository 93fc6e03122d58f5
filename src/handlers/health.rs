use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use consumer_metrics::ReporterState;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub consumer: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub reporting: bool,
    pub registered_metrics: usize,
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let reporting = state.metrics.reporter_state() == ReporterState::Running;
    Json(HealthStatus {
        status: if reporting { "ok" } else { "closed" },
        consumer: state.consumer_name.clone(),
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        reporting,
        registered_metrics: state.metrics.registry().len(),
    })
}
