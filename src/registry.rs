//! Name → metric registry.
//!
//! The map itself sits behind a `parking_lot::RwLock` that only guards
//! structure (insert / remove). Metric values are mutated through the
//! handles, so producers never take the registry lock on the hot path and a
//! snapshot walk never blocks an update.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::metrics::{
    Clock, Counter, Gauge, Histogram, Meter, Metric, MetricKind, SystemClock, Timer,
};

pub struct Registry {
    metrics: RwLock<HashMap<String, Metric>>,
    clock: Arc<dyn Clock>,
    reservoir_size: usize,
    decay_alpha: f64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl Registry {
    pub fn new(config: &MetricsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Registry whose meters, histograms and timers read time from `clock`.
    pub fn with_clock(config: &MetricsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            clock,
            reservoir_size: config.reservoir_size,
            decay_alpha: config.decay_alpha,
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// Returns the metric registered under `name`, creating it with
    /// `factory` when absent.
    ///
    /// The factory runs at most once per name, under the write lock. Asking
    /// for a different kind than the one already registered is an error.
    pub fn register<F>(
        &self,
        name: &str,
        kind: MetricKind,
        factory: F,
    ) -> Result<Metric, MetricsError>
    where
        F: FnOnce() -> Metric,
    {
        // Fast path: already registered
        if let Some(existing) = self.metrics.read().get(name) {
            return check_kind(name, existing, kind);
        }

        let mut metrics = self.metrics.write();
        if let Some(existing) = metrics.get(name) {
            return check_kind(name, existing, kind);
        }

        let metric = factory();
        if metric.kind() != kind {
            return Err(mismatch(name, &metric, kind));
        }
        metrics.insert(name.to_owned(), metric.clone());
        tracing::debug!(metric = name, kind = %kind, "Registered metric");
        Ok(metric)
    }

    /// Registers `metric` under `name`, failing if the name is taken.
    pub fn try_register(&self, name: &str, metric: Metric) -> Result<(), MetricsError> {
        let mut metrics = self.metrics.write();
        if metrics.contains_key(name) {
            return Err(MetricsError::Duplicate(name.to_owned()));
        }
        metrics.insert(name.to_owned(), metric);
        Ok(())
    }

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, MetricsError> {
        let metric = self.register(name, MetricKind::Counter, || {
            Metric::Counter(Arc::new(Counter::new()))
        })?;
        match metric {
            Metric::Counter(handle) => Ok(handle),
            other => Err(mismatch(name, &other, MetricKind::Counter)),
        }
    }

    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>, MetricsError> {
        let metric = self.register(name, MetricKind::Gauge, || {
            Metric::Gauge(Arc::new(Gauge::new()))
        })?;
        match metric {
            Metric::Gauge(handle) => Ok(handle),
            other => Err(mismatch(name, &other, MetricKind::Gauge)),
        }
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, MetricsError> {
        let metric = self.register(name, MetricKind::Histogram, || {
            Metric::Histogram(Arc::new(Histogram::with_clock(
                self.reservoir_size,
                self.decay_alpha,
                self.clock.clone(),
            )))
        })?;
        match metric {
            Metric::Histogram(handle) => Ok(handle),
            other => Err(mismatch(name, &other, MetricKind::Histogram)),
        }
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, MetricsError> {
        let metric = self.register(name, MetricKind::Meter, || {
            Metric::Meter(Arc::new(Meter::with_clock(self.clock.clone())))
        })?;
        match metric {
            Metric::Meter(handle) => Ok(handle),
            other => Err(mismatch(name, &other, MetricKind::Meter)),
        }
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, MetricsError> {
        let metric = self.register(name, MetricKind::Timer, || {
            Metric::Timer(Arc::new(Timer::with_clock(
                self.reservoir_size,
                self.decay_alpha,
                self.clock.clone(),
            )))
        })?;
        match metric {
            Metric::Timer(handle) => Ok(handle),
            other => Err(mismatch(name, &other, MetricKind::Timer)),
        }
    }

    // ── Lookup / enumeration ────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    /// Calls `visit` once for every registered metric.
    ///
    /// Entries are copied out first, so `visit` runs without the registry
    /// lock held and may itself register metrics.
    pub fn each<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &Metric),
    {
        let entries: Vec<(String, Metric)> = self
            .metrics
            .read()
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();

        for (name, metric) in &entries {
            visit(name, metric);
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    // ── Removal ─────────────────────────────────────────────────

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.write().remove(name)
    }

    /// Drops every registration. Handles already handed out keep working
    /// but no longer appear in snapshots.
    pub fn unregister_all(&self) {
        let removed = std::mem::take(&mut *self.metrics.write());
        tracing::debug!(count = removed.len(), "Unregistered all metrics");
    }
}

fn check_kind(
    name: &str,
    existing: &Metric,
    requested: MetricKind,
) -> Result<Metric, MetricsError> {
    if existing.kind() == requested {
        Ok(existing.clone())
    } else {
        Err(mismatch(name, existing, requested))
    }
}

fn mismatch(name: &str, existing: &Metric, requested: MetricKind) -> MetricsError {
    MetricsError::KindMismatch {
        name: name.to_owned(),
        existing: existing.kind(),
        requested,
    }
}
