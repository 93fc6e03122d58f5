use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::{IntervalStream, WatchStream};
use tokio_stream::StreamExt;

use consumer_metrics::Stats;

use crate::AppState;

/// How often the SSE stream pushes a fresh snapshot.
const STREAM_INTERVAL: Duration = Duration::from_millis(500);

// ─── GET /api/stats ──────────────────────────────────────────────
/// Returns a single snapshot, independent of the reporting schedule.

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.metrics.stats())
}

// ─── GET /api/stats/stream ───────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the full snapshot as JSON every 500 ms until the server starts
/// shutting down, then ends the stream so graceful shutdown can finish.

pub async fn stats_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(STREAM_INTERVAL);
    let shutdown = WatchStream::new(state.shutdown.clone());

    let stream = IntervalStream::new(interval).map(move |_| {
        let event = match serde_json::to_string(&state.metrics.stats()) {
            Ok(json) => Event::default().data(json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize stats for stream");
                Event::default().event("error").data(e.to_string())
            }
        };
        Some(Ok(event))
    });

    // `None` marks shutdown; `map_while` ends the stream on it
    let shutdown = shutdown
        .filter(|stopping| *stopping)
        .map(|_| None::<Result<Event, Infallible>>);
    let stream = stream.merge(shutdown).map_while(|item| item);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
