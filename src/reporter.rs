//! Periodic reporting task.
//!
//! A `Reporter` owns one background tokio task that wakes at the emitter's
//! interval, snapshots the registry, serializes it and hands the bytes to
//! the emitter. Producers never wait on any of this.
//!
//! Lifecycle: `Running` from construction until `stop()` or until the task
//! ends on its own (serialization failure under the `stop` policy), then
//! `Stopped` for good. `stop()` waits for an in-flight tick, so nothing is
//! emitted after it returns, and then clears the registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{ReporterConfig, SerializationFailurePolicy};
use crate::emitter::MetricsEmitter;
use crate::error::{EmitError, MetricsError};
use crate::registry::Registry;
use crate::snapshot::{snapshot, to_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Running,
    Stopped,
}

pub struct Reporter {
    registry: Arc<Registry>,
    interval: Duration,
    /// Wakes the task out of its tick wait
    shutdown: Arc<Notify>,
    /// Set by `stop()` or by the task itself when it exits
    stopped: Arc<AtomicBool>,
    /// Held across the join so concurrent `stop()` calls all wait for it
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reporter {
    /// Spawns the reporting task on the current tokio runtime.
    ///
    /// The first report fires one full interval after this call.
    pub fn start(
        registry: Arc<Registry>,
        emitter: Arc<dyn MetricsEmitter>,
        config: &ReporterConfig,
    ) -> Result<Self, MetricsError> {
        Self::start_with_encoder(registry, emitter, config, encode_snapshot)
    }

    fn start_with_encoder(
        registry: Arc<Registry>,
        emitter: Arc<dyn MetricsEmitter>,
        config: &ReporterConfig,
        encode: Encoder,
    ) -> Result<Self, MetricsError> {
        config.validate()?;

        let interval = emitter.reporting_interval();
        if interval.is_zero() {
            return Err(MetricsError::InvalidConfig(
                "reporting interval must be greater than zero".into(),
            ));
        }
        let first_tick = Instant::now().checked_add(interval).ok_or_else(|| {
            MetricsError::InvalidConfig(format!("reporting interval {interval:?} is too large"))
        })?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricsError::Runtime(e.to_string()))?;

        let shutdown = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));
        let task = ReportTask {
            registry: Arc::clone(&registry),
            emitter,
            encode,
            shutdown: Arc::clone(&shutdown),
            stopped: Arc::clone(&stopped),
            interval,
            emit_timeout: config.emit_timeout(),
            on_serialization_failure: config.on_serialization_failure,
        };
        let handle = runtime.spawn(task.run(first_tick));

        Ok(Self {
            registry,
            interval,
            shutdown,
            stopped,
            task_handle: Mutex::new(Some(handle)),
        })
    }

    pub fn state(&self) -> ReporterState {
        if self.stopped.load(Ordering::SeqCst) {
            ReporterState::Stopped
        } else {
            ReporterState::Running
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the task, waits for it to finish and unregisters every metric.
    ///
    /// Calling it again is a no-op.
    pub async fn stop(&self) -> Result<(), MetricsError> {
        let mut task_handle = self.task_handle.lock().await;
        let Some(handle) = task_handle.take() else {
            tracing::debug!("Metrics reporter already stopped");
            return Ok(());
        };

        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();

        let joined = handle.await;
        self.registry.unregister_all();

        joined.map_err(|e| MetricsError::Join(e.to_string()))
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        // Never leave the task running unowned
        if let Some(handle) = self.task_handle.get_mut().take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────

/// Turns the registry into the bytes handed to the emitter.
type Encoder = fn(&Registry) -> Result<Vec<u8>, MetricsError>;

fn encode_snapshot(registry: &Registry) -> Result<Vec<u8>, MetricsError> {
    to_json(&snapshot(registry))
}

struct ReportTask {
    registry: Arc<Registry>,
    emitter: Arc<dyn MetricsEmitter>,
    encode: Encoder,
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    interval: Duration,
    emit_timeout: Option<Duration>,
    on_serialization_failure: SerializationFailurePolicy,
}

impl ReportTask {
    async fn run(self, first_tick: Instant) {
        let mut ticker = time::interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Metrics reporter started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => break,
                _ = ticker.tick() => {},
            }

            let payload = match (self.encode)(&self.registry) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize metrics snapshot");
                    match self.on_serialization_failure {
                        SerializationFailurePolicy::Stop => break,
                        SerializationFailurePolicy::Skip => continue,
                    }
                }
            };

            match self.emit(&payload).await {
                Ok(()) => {
                    tracing::debug!(bytes = payload.len(), "Emitted metrics snapshot");
                }
                Err(e) => {
                    // Drop this tick's payload; the next tick starts fresh
                    tracing::warn!(error = %e, "Failed to emit metrics snapshot");
                }
            }
        }

        self.stopped.store(true, Ordering::SeqCst);
        tracing::info!("Metrics reporter stopped");
    }

    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
        match self.emit_timeout {
            Some(limit) => time::timeout(limit, self.emitter.emit(payload))
                .await
                .map_err(|_| EmitError::Timeout(limit))?,
            None => self.emitter.emit(payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::AtomicUsize;

    /// Records every payload it receives.
    struct RecordingEmitter {
        interval: Duration,
        payloads: SyncMutex<Vec<Vec<u8>>>,
    }

    impl RecordingEmitter {
        fn new(interval: Duration) -> Arc<Self> {
            Arc::new(Self {
                interval,
                payloads: SyncMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.payloads.lock().len()
        }
    }

    #[async_trait]
    impl MetricsEmitter for RecordingEmitter {
        fn reporting_interval(&self) -> Duration {
            self.interval
        }

        async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
            self.payloads.lock().push(payload.to_vec());
            Ok(())
        }
    }

    /// Fails every emit, optionally after stalling.
    struct FailingEmitter {
        interval: Duration,
        stall: Option<Duration>,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl MetricsEmitter for FailingEmitter {
        fn reporting_interval(&self) -> Duration {
            self.interval
        }

        async fn emit(&self, _payload: &[u8]) -> Result<(), EmitError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                time::sleep(stall).await;
            }
            Err(EmitError::Rejected("sink unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_reporter_emits_snapshot_json() {
        let registry = Arc::new(Registry::default());
        registry.counter("X").unwrap().inc(5);
        let emitter = RecordingEmitter::new(Duration::from_millis(20));

        let reporter =
            Reporter::start(registry.clone(), emitter.clone(), &ReporterConfig::default()).unwrap();
        time::sleep(Duration::from_millis(70)).await;
        reporter.stop().await.unwrap();

        assert!(emitter.calls() >= 2, "expected at least 2 emits");
        let payloads = emitter.payloads.lock();
        let doc: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
        assert_eq!(doc, serde_json::json!({"X": {"count": 5.0}}));
    }

    #[tokio::test]
    async fn test_reporter_rejects_zero_interval() {
        let registry = Arc::new(Registry::default());
        let emitter = RecordingEmitter::new(Duration::ZERO);
        let result = Reporter::start(registry, emitter, &ReporterConfig::default());
        assert!(matches!(result, Err(MetricsError::InvalidConfig(_))));
    }

    #[test]
    fn test_reporter_requires_runtime() {
        let registry = Arc::new(Registry::default());
        let emitter = RecordingEmitter::new(Duration::from_millis(10));
        let result = Reporter::start(registry, emitter, &ReporterConfig::default());
        assert!(matches!(result, Err(MetricsError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_reporter_stop_is_idempotent() {
        let registry = Arc::new(Registry::default());
        registry.gauge("g").unwrap();
        let emitter = RecordingEmitter::new(Duration::from_millis(10));

        let reporter =
            Reporter::start(registry.clone(), emitter.clone(), &ReporterConfig::default()).unwrap();
        assert_eq!(reporter.state(), ReporterState::Running);

        reporter.stop().await.unwrap();
        assert_eq!(reporter.state(), ReporterState::Stopped);
        assert!(registry.is_empty());

        // Metrics registered after the first stop survive a second one
        registry.gauge("late").unwrap();
        reporter.stop().await.unwrap();
        assert_eq!(reporter.state(), ReporterState::Stopped);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_reporter_survives_emit_failures() {
        let registry = Arc::new(Registry::default());
        let emitter = Arc::new(FailingEmitter {
            interval: Duration::from_millis(20),
            stall: None,
            attempts: AtomicUsize::new(0),
        });

        let reporter =
            Reporter::start(registry, emitter.clone(), &ReporterConfig::default()).unwrap();
        time::sleep(Duration::from_millis(110)).await;
        reporter.stop().await.unwrap();

        assert!(emitter.attempts.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_reporter_bounds_slow_emits() {
        let registry = Arc::new(Registry::default());
        let emitter = Arc::new(FailingEmitter {
            interval: Duration::from_millis(20),
            stall: Some(Duration::from_secs(30)),
            attempts: AtomicUsize::new(0),
        });
        let config = ReporterConfig {
            emit_timeout_ms: Some(10),
            ..ReporterConfig::default()
        };

        let reporter = Reporter::start(registry, emitter.clone(), &config).unwrap();
        time::sleep(Duration::from_millis(150)).await;
        reporter.stop().await.unwrap();

        // Without the timeout the first stalled emit would be the only one
        assert!(emitter.attempts.load(Ordering::SeqCst) >= 2);
    }

    fn failing_encoder(_registry: &Registry) -> Result<Vec<u8>, MetricsError> {
        Err(MetricsError::InvalidConfig("unencodable snapshot".into()))
    }

    #[tokio::test]
    async fn test_serialization_failure_stops_task() {
        let registry = Arc::new(Registry::default());
        registry.counter("c").unwrap();
        let emitter = RecordingEmitter::new(Duration::from_millis(10));

        let reporter = Reporter::start_with_encoder(
            registry.clone(),
            emitter.clone(),
            &ReporterConfig::default(),
            failing_encoder,
        )
        .unwrap();
        time::sleep(Duration::from_millis(60)).await;

        // The task ended on its own and says so
        assert_eq!(reporter.state(), ReporterState::Stopped);
        assert_eq!(emitter.calls(), 0);

        // stop() still joins and clears
        reporter.stop().await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_serialization_failure_skipped_keeps_running() {
        let registry = Arc::new(Registry::default());
        let emitter = RecordingEmitter::new(Duration::from_millis(10));
        let config = ReporterConfig {
            on_serialization_failure: SerializationFailurePolicy::Skip,
            ..ReporterConfig::default()
        };

        let reporter =
            Reporter::start_with_encoder(registry, emitter.clone(), &config, failing_encoder)
                .unwrap();
        time::sleep(Duration::from_millis(60)).await;

        assert_eq!(reporter.state(), ReporterState::Running);
        assert_eq!(emitter.calls(), 0);

        reporter.stop().await.unwrap();
        assert_eq!(reporter.state(), ReporterState::Stopped);
    }
}
