use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::histogram::{Histogram, HistogramSnapshot};
use super::meter::{Meter, MeterSnapshot};
use crate::config::{DEFAULT_DECAY_ALPHA, DEFAULT_RESERVOIR_SIZE};

/// Duration distribution (in nanoseconds) paired with an occurrence rate.
#[derive(Debug)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    clock: Arc<dyn Clock>,
}

/// Point-in-time read of a timer; durations are nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerSnapshot {
    pub histogram: HistogramSnapshot,
    pub meter: MeterSnapshot,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE, DEFAULT_DECAY_ALPHA)
    }
}

impl Timer {
    pub fn new(reservoir_size: usize, alpha: f64) -> Self {
        Self::with_clock(reservoir_size, alpha, Arc::new(SystemClock))
    }

    pub fn with_clock(reservoir_size: usize, alpha: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            histogram: Histogram::with_clock(reservoir_size, alpha, clock.clone()),
            meter: Meter::with_clock(clock.clone()),
            clock,
        }
    }

    /// Records one duration and marks one occurrence.
    pub fn update(&self, elapsed: Duration) {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    /// Records the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(self.clock.now().saturating_duration_since(start));
    }

    /// Runs `f` and records how long it took.
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = self.clock.now();
        let result = f();
        self.update_since(start);
        result
    }

    /// Starts a measurement that is recorded on `stop()` or on drop.
    pub fn start(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            start: self.clock.now(),
            recorded: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            histogram: self.histogram.snapshot(),
            meter: self.meter.snapshot(),
        }
    }
}

/// In-flight measurement returned by [`Timer::start`].
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: Instant,
    recorded: bool,
}

impl TimerContext<'_> {
    /// Records the measurement and returns the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.timer.clock.now().saturating_duration_since(self.start);
        if !self.recorded {
            self.recorded = true;
            self.timer.update(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.record();
        }
    }
}
