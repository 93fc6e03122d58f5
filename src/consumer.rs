use std::sync::Arc;

use crate::config::MetricsConfig;
use crate::emitter::MetricsEmitter;
use crate::error::MetricsError;
use crate::metrics::{Clock, Counter, Gauge, SystemClock, Timer};
use crate::registry::Registry;
use crate::reporter::{Reporter, ReporterState};
use crate::snapshot::{snapshot, Stats};

/// Operational metrics of one consumer instance.
///
/// Fetch routines and worker managers grab the handles they need once and
/// update them inline. A reporter pushes a snapshot of everything through
/// the emitter on every tick until [`ConsumerMetrics::close`] is called.
pub struct ConsumerMetrics {
    registry: Arc<Registry>,
    reporter: Reporter,

    // Fetchers
    num_fetch_routines_counter: Arc<Counter>,
    fetchers_idle_timer: Arc<Timer>,
    fetch_duration_timer: Arc<Timer>,

    // Worker managers
    num_worker_managers_gauge: Arc<Gauge>,
    active_workers_counter: Arc<Counter>,
    pending_wms_tasks_counter: Arc<Counter>,
    wms_batch_duration_timer: Arc<Timer>,
    wms_idle_timer: Arc<Timer>,
}

impl ConsumerMetrics {
    /// Registers the consumer's metrics under names suffixed with
    /// `consumer_name` and starts reporting through `emitter`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        consumer_name: &str,
        emitter: Arc<dyn MetricsEmitter>,
        config: &MetricsConfig,
    ) -> Result<Self, MetricsError> {
        Self::with_clock(consumer_name, emitter, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        consumer_name: &str,
        emitter: Arc<dyn MetricsEmitter>,
        config: &MetricsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MetricsError> {
        config.validate()?;
        let registry = Arc::new(Registry::with_clock(config, clock));
        let name = |prefix: &str| format!("{prefix}-{consumer_name}");

        let num_fetch_routines_counter = registry.counter(&name("NumFetchRoutines"))?;
        let fetchers_idle_timer = registry.timer(&name("FetchersIdleTime"))?;
        let fetch_duration_timer = registry.timer(&name("FetchDuration"))?;

        let num_worker_managers_gauge = registry.gauge(&name("NumWorkerManagers"))?;
        let active_workers_counter = registry.counter(&name("WMsActiveWorkers"))?;
        let pending_wms_tasks_counter = registry.counter(&name("WMsPendingTasks"))?;
        let wms_batch_duration_timer = registry.timer(&name("WMsBatchDuration"))?;
        let wms_idle_timer = registry.timer(&name("WMsIdleTime"))?;

        let reporter = Reporter::start(Arc::clone(&registry), emitter, &config.reporter)?;
        tracing::info!(
            consumer = consumer_name,
            metrics = registry.len(),
            interval_ms = reporter.interval().as_millis() as u64,
            "Consumer metrics registered"
        );

        Ok(Self {
            registry,
            reporter,
            num_fetch_routines_counter,
            fetchers_idle_timer,
            fetch_duration_timer,
            num_worker_managers_gauge,
            active_workers_counter,
            pending_wms_tasks_counter,
            wms_batch_duration_timer,
            wms_idle_timer,
        })
    }

    // ── Handles ─────────────────────────────────────────────────

    pub fn num_fetch_routines_counter(&self) -> &Arc<Counter> {
        &self.num_fetch_routines_counter
    }

    pub fn fetchers_idle_timer(&self) -> &Arc<Timer> {
        &self.fetchers_idle_timer
    }

    pub fn fetch_duration_timer(&self) -> &Arc<Timer> {
        &self.fetch_duration_timer
    }

    pub fn num_worker_managers_gauge(&self) -> &Arc<Gauge> {
        &self.num_worker_managers_gauge
    }

    pub fn active_workers_counter(&self) -> &Arc<Counter> {
        &self.active_workers_counter
    }

    pub fn pending_wms_tasks_counter(&self) -> &Arc<Counter> {
        &self.pending_wms_tasks_counter
    }

    pub fn wms_batch_duration_timer(&self) -> &Arc<Timer> {
        &self.wms_batch_duration_timer
    }

    pub fn wms_idle_timer(&self) -> &Arc<Timer> {
        &self.wms_idle_timer
    }

    /// The underlying registry, for metrics beyond the built-in set.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ── Queries / lifecycle ─────────────────────────────────────

    /// Current statistics of every registered metric.
    pub fn stats(&self) -> Stats {
        snapshot(&self.registry)
    }

    pub fn reporter_state(&self) -> ReporterState {
        self.reporter.state()
    }

    /// Stops reporting and discards all registered metrics. Idempotent.
    pub async fn close(&self) -> Result<(), MetricsError> {
        self.reporter.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::NoopEmitter;

    #[tokio::test]
    async fn test_consumer_metrics_names() {
        let metrics =
            ConsumerMetrics::new("c1", Arc::new(NoopEmitter::new()), &MetricsConfig::default())
                .unwrap();

        let stats = metrics.stats();
        let names: Vec<&str> = stats.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                "FetchDuration-c1",
                "FetchersIdleTime-c1",
                "NumFetchRoutines-c1",
                "NumWorkerManagers-c1",
                "WMsActiveWorkers-c1",
                "WMsBatchDuration-c1",
                "WMsIdleTime-c1",
                "WMsPendingTasks-c1",
            ]
        );
        metrics.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_consumer_metrics_rejects_invalid_config() {
        let config = MetricsConfig {
            reservoir_size: 0,
            ..MetricsConfig::default()
        };
        let result = ConsumerMetrics::new("c1", Arc::new(NoopEmitter::new()), &config);
        assert!(matches!(result, Err(MetricsError::InvalidConfig(_))));
    }
}
