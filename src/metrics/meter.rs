use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};
use super::ewma::{Ewma, TICK_INTERVAL};

/// Occurrence rate: a total count plus 1/5/15-minute moving averages and
/// the mean rate since creation.
///
/// The averages are decayed lazily. Every mark and every read first applies
/// the ticks that have elapsed since the last one, so no background task is
/// needed to keep them current.
#[derive(Debug)]
pub struct Meter {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct Inner {
    count: i64,
    started_at: Instant,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

/// Point-in-time read of a meter. Rates are events per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            inner: Mutex::new(Inner {
                count: 0,
                started_at: now,
                last_tick: now,
                m1: Ewma::one_minute(),
                m5: Ewma::five_minutes(),
                m15: Ewma::fifteen_minutes(),
            }),
            clock,
        }
    }

    /// Records `n` occurrences.
    pub fn mark(&self, n: i64) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.tick_if_necessary(now);
        inner.count = inner.count.saturating_add(n);
        inner.m1.update(n);
        inner.m5.update(n);
        inner.m15.update(n);
    }

    pub fn count(&self) -> i64 {
        self.inner.lock().count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.tick_if_necessary(now);

        let elapsed = now.saturating_duration_since(inner.started_at).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            inner.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: inner.count,
            rate1: inner.m1.rate(),
            rate5: inner.m5.rate(),
            rate15: inner.m15.rate(),
            rate_mean,
        }
    }
}

impl Inner {
    fn tick_if_necessary(&mut self, now: Instant) {
        let age = now.saturating_duration_since(self.last_tick);
        let ticks = age.as_nanos() / TICK_INTERVAL.as_nanos();
        if ticks == 0 {
            return;
        }

        // Advance by whole ticks only so the remainder carries over
        self.last_tick += TICK_INTERVAL * ticks.min(u32::MAX as u128) as u32;
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }
}
