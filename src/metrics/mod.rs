//! Metric primitives.
//!
//! Counters and gauges are plain atomics. Histograms, meters and timers keep
//! their state behind a per-metric `parking_lot::Mutex`, so producers only
//! ever contend on the single metric they touch.

pub mod clock;
pub mod counter;
pub mod ewma;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod sample;
pub mod timer;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{Histogram, HistogramSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use timer::{Timer, TimerContext, TimerSnapshot};

/// Statistic name → value for a single metric.
pub type StatSet = BTreeMap<String, f64>;

/// The five metric kinds a registry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Meter => "meter",
            Self::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// Shared handle to a registered metric.
///
/// Cloning is cheap and every clone points at the same underlying metric.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }

    /// Computes the statistics reported for this metric's kind.
    pub fn stats(&self) -> StatSet {
        let pairs: Vec<(&str, f64)> = match self {
            Self::Counter(c) => vec![("count", c.count() as f64)],
            Self::Gauge(g) => vec![("value", g.value() as f64)],
            Self::Histogram(h) => histogram_stats(&h.snapshot()),
            Self::Meter(m) => meter_stats(&m.snapshot()),
            Self::Timer(t) => {
                let snap = t.snapshot();
                let mut pairs = histogram_stats(&snap.histogram);
                pairs.extend(
                    meter_stats(&snap.meter)
                        .into_iter()
                        .filter(|(name, _)| *name != "count"),
                );
                pairs
            }
        };

        pairs
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect()
    }

    pub fn as_counter(&self) -> Option<&Arc<Counter>> {
        match self {
            Self::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Arc<Gauge>> {
        match self {
            Self::Gauge(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Arc<Histogram>> {
        match self {
            Self::Histogram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_meter(&self) -> Option<&Arc<Meter>> {
        match self {
            Self::Meter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Arc<Timer>> {
        match self {
            Self::Timer(t) => Some(t),
            _ => None,
        }
    }
}

fn histogram_stats(snap: &HistogramSnapshot) -> Vec<(&'static str, f64)> {
    vec![
        ("count", snap.count as f64),
        ("max", snap.max as f64),
        ("min", snap.min as f64),
        ("mean", snap.mean),
        ("stdDev", snap.std_dev),
        ("sum", snap.sum as f64),
        ("variance", snap.variance),
    ]
}

fn meter_stats(snap: &MeterSnapshot) -> Vec<(&'static str, f64)> {
    vec![
        ("count", snap.count as f64),
        ("rate1", snap.rate1),
        ("rate5", snap.rate5),
        ("rate15", snap.rate15),
        ("rateMean", snap.rate_mean),
    ]
}
