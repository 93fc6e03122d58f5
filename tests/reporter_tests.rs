//! Lifecycle tests for the reporting task and `ConsumerMetrics`.
//!
//! These run against real time with generous bounds to absorb scheduler
//! jitter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use consumer_metrics::{
    ConsumerMetrics, EmitError, MetricsConfig, MetricsEmitter, Registry, Reporter,
    ReporterConfig, ReporterState,
};

/// Test emitter that counts calls and keeps the last payload.
struct RecordingEmitter {
    interval: Duration,
    calls: AtomicUsize,
    last: Mutex<Option<Vec<u8>>>,
}

impl RecordingEmitter {
    fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_json(&self) -> serde_json::Value {
        let last = self.last.lock();
        serde_json::from_slice(last.as_deref().expect("at least one payload")).unwrap()
    }
}

#[async_trait]
impl MetricsEmitter for RecordingEmitter {
    fn reporting_interval(&self) -> Duration {
        self.interval
    }

    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
        *self.last.lock() = Some(payload.to_vec());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Scheduler lifecycle
// =============================================================================

/// 50 ms interval over 220 ms fires 4 times, give or take jitter, and
/// nothing fires once close has returned.
#[tokio::test]
async fn reporter_ticks_at_interval_and_stops_on_close() {
    let emitter = RecordingEmitter::new(Duration::from_millis(50));
    let metrics =
        ConsumerMetrics::new("lifecycle", emitter.clone(), &MetricsConfig::default()).unwrap();

    tokio::time::sleep(Duration::from_millis(220)).await;
    metrics.close().await.unwrap();

    let calls_at_close = emitter.calls();
    assert!(
        (3..=5).contains(&calls_at_close),
        "expected 3..=5 emits, got {calls_at_close}"
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(emitter.calls(), calls_at_close, "emit after close returned");
}

#[tokio::test]
async fn no_emit_before_first_interval() {
    let emitter = RecordingEmitter::new(Duration::from_millis(200));
    let metrics =
        ConsumerMetrics::new("early", emitter.clone(), &MetricsConfig::default()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(emitter.calls(), 0);
    metrics.close().await.unwrap();
    assert_eq!(emitter.calls(), 0);
}

#[tokio::test]
async fn close_discards_metrics_and_is_idempotent() {
    let emitter = RecordingEmitter::new(Duration::from_millis(20));
    let metrics =
        ConsumerMetrics::new("closing", emitter.clone(), &MetricsConfig::default()).unwrap();
    let active = Arc::clone(metrics.active_workers_counter());

    assert_eq!(metrics.stats().len(), 8);
    assert_eq!(metrics.reporter_state(), ReporterState::Running);

    metrics.close().await.unwrap();
    assert_eq!(metrics.reporter_state(), ReporterState::Stopped);
    assert!(metrics.stats().is_empty());

    // Second close is a no-op
    metrics.close().await.unwrap();
    assert_eq!(metrics.reporter_state(), ReporterState::Stopped);

    // Handles obtained before close stay usable
    active.inc(3);
    assert_eq!(active.count(), 3);
}

#[tokio::test]
async fn concurrent_closes_all_wait_for_the_task() {
    let emitter = RecordingEmitter::new(Duration::from_millis(10));
    let metrics = Arc::new(
        ConsumerMetrics::new("racing", emitter.clone(), &MetricsConfig::default()).unwrap(),
    );
    tokio::time::sleep(Duration::from_millis(35)).await;

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let m = Arc::clone(&metrics);
            tokio::spawn(async move { m.close().await })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap().unwrap();
    }

    let calls = emitter.calls();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(emitter.calls(), calls);
}

// =============================================================================
// Payload content
// =============================================================================

#[tokio::test]
async fn emitted_payload_reflects_producer_updates() {
    let emitter = RecordingEmitter::new(Duration::from_millis(30));
    let metrics =
        ConsumerMetrics::new("payload", emitter.clone(), &MetricsConfig::default()).unwrap();

    metrics.num_worker_managers_gauge().update(3);
    metrics.pending_wms_tasks_counter().inc(7);
    metrics
        .fetch_duration_timer()
        .update(Duration::from_millis(4));

    tokio::time::sleep(Duration::from_millis(80)).await;
    metrics.close().await.unwrap();

    let doc = emitter.last_json();
    assert_eq!(doc["NumWorkerManagers-payload"]["value"], 3.0);
    assert_eq!(doc["WMsPendingTasks-payload"]["count"], 7.0);
    assert_eq!(doc["FetchDuration-payload"]["count"], 1.0);
    assert_eq!(doc["FetchDuration-payload"]["max"], 4_000_000.0);
    assert_eq!(doc["FetchersIdleTime-payload"]["count"], 0.0);
}

#[tokio::test]
async fn reporter_over_shared_registry() {
    let registry = Arc::new(Registry::default());
    let emitter = RecordingEmitter::new(Duration::from_millis(25));
    let reporter =
        Reporter::start(Arc::clone(&registry), emitter.clone(), &ReporterConfig::default())
            .unwrap();

    // Metrics registered after start are picked up on the next tick
    registry.counter("late").unwrap().inc(2);
    tokio::time::sleep(Duration::from_millis(70)).await;
    reporter.stop().await.unwrap();

    assert_eq!(emitter.last_json()["late"]["count"], 2.0);
    assert!(registry.is_empty());
}
