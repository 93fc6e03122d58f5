use std::time::Duration;

/// Interval at which every EWMA is decayed.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially weighted moving average of an event rate.
///
/// Events are accumulated with [`Ewma::update`] and folded into the average
/// once per [`TICK_INTERVAL`] by [`Ewma::tick`]. The rate is kept in events
/// per second.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: i64,
    initialized: bool,
}

impl Ewma {
    /// Average over a window of `minutes`, ticked every [`TICK_INTERVAL`].
    pub fn with_window(minutes: f64) -> Self {
        let tick_secs = TICK_INTERVAL.as_secs_f64();
        Self::with_alpha(1.0 - (-tick_secs / 60.0 / minutes).exp())
    }

    pub fn one_minute() -> Self {
        Self::with_window(1.0)
    }

    pub fn five_minutes() -> Self {
        Self::with_window(5.0)
    }

    pub fn fifteen_minutes() -> Self {
        Self::with_window(15.0)
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    pub fn update(&mut self, n: i64) {
        self.uncounted = self.uncounted.saturating_add(n);
    }

    /// Folds the events seen since the previous tick into the average.
    pub fn tick(&mut self) {
        let count = std::mem::take(&mut self.uncounted);
        let instant_rate = count as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Events per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}
