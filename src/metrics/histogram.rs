use std::sync::Arc;

use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};
use super::sample::ExpDecaySample;
use crate::config::{DEFAULT_DECAY_ALPHA, DEFAULT_RESERVOIR_SIZE};

/// Distribution of signed samples over a decaying reservoir.
///
/// `count` and `sum` cover every sample ever recorded; the remaining
/// statistics are computed from whatever the reservoir currently holds.
#[derive(Debug)]
pub struct Histogram {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct Inner {
    sample: ExpDecaySample,
    sum: i64,
}

/// Point-in-time read of a histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub std_dev: f64,
    pub variance: f64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE, DEFAULT_DECAY_ALPHA)
    }
}

impl Histogram {
    pub fn new(reservoir_size: usize, alpha: f64) -> Self {
        Self::with_clock(reservoir_size, alpha, Arc::new(SystemClock))
    }

    pub fn with_clock(reservoir_size: usize, alpha: f64, clock: Arc<dyn Clock>) -> Self {
        let sample = ExpDecaySample::new(reservoir_size, alpha, clock.now());
        Self {
            inner: Mutex::new(Inner { sample, sum: 0 }),
            clock,
        }
    }

    /// Records one sample. Never blocks beyond this histogram's own lock.
    pub fn update(&self, value: i64) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.sum = inner.sum.saturating_add(value);
        inner.sample.update(value, now);
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().sample.count()
    }

    pub fn sum(&self) -> i64 {
        self.inner.lock().sum
    }

    /// Reads every statistic under a single lock acquisition.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let inner = self.inner.lock();
        let stats = inner.sample.stats();
        HistogramSnapshot {
            count: inner.sample.count(),
            sum: inner.sum,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            std_dev: stats.std_dev(),
            variance: stats.variance,
        }
    }
}
