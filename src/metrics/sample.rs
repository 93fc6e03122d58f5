//! Exponentially decaying reservoir.
//!
//! Forward-decay priority sampling: every sample gets the priority
//! `exp(alpha * age_of_landmark) / u` with `u` uniform in `(0, 1]`, and the
//! reservoir keeps the `reservoir_size` highest priorities. Newer samples get
//! exponentially larger weights, so the retained set leans towards recent
//! data while memory stays bounded. The landmark is moved forward every hour
//! and all priorities are rescaled so they never overflow.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

// ─── Heap entry ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Prioritized {
    priority: f64,
    value: i64,
}

// Reversed so that `BinaryHeap::peek` yields the lowest priority.
impl Ord for Prioritized {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

impl PartialOrd for Prioritized {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Prioritized {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Prioritized {}

// ─── Reservoir ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct ExpDecaySample {
    reservoir_size: usize,
    alpha: f64,
    landmark: Instant,
    next_rescale: Instant,
    count: u64,
    values: BinaryHeap<Prioritized>,
    rng: StdRng,
}

impl ExpDecaySample {
    pub fn new(reservoir_size: usize, alpha: f64, now: Instant) -> Self {
        Self::with_rng(reservoir_size, alpha, now, StdRng::from_entropy())
    }

    /// Same as [`ExpDecaySample::new`] with a caller-provided RNG, so the
    /// eviction order can be made reproducible.
    pub fn with_rng(reservoir_size: usize, alpha: f64, now: Instant, rng: StdRng) -> Self {
        let reservoir_size = reservoir_size.max(1);
        Self {
            reservoir_size,
            alpha,
            landmark: now,
            next_rescale: now + RESCALE_THRESHOLD,
            count: 0,
            values: BinaryHeap::with_capacity(reservoir_size),
            rng,
        }
    }

    pub fn update(&mut self, value: i64, now: Instant) {
        if now >= self.next_rescale {
            self.rescale(now);
        }
        self.count += 1;

        let age = now.saturating_duration_since(self.landmark).as_secs_f64();
        // 1 - [0, 1) keeps the divisor strictly positive
        let u = 1.0 - self.rng.gen::<f64>();
        let entry = Prioritized {
            priority: (self.alpha * age).exp() / u,
            value,
        };

        if self.values.len() < self.reservoir_size {
            self.values.push(entry);
            return;
        }

        // Full: replace the lowest priority only if the newcomer beats it
        if let Some(lowest) = self.values.peek() {
            if entry.priority > lowest.priority {
                self.values.pop();
                self.values.push(entry);
            }
        }
    }

    fn rescale(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.landmark).as_secs_f64();
        let factor = (-self.alpha * elapsed).exp();

        self.landmark = now;
        self.next_rescale = now + RESCALE_THRESHOLD;
        self.values = self
            .values
            .drain()
            .map(|mut entry| {
                entry.priority *= factor;
                entry
            })
            .collect();
    }

    /// Number of samples ever offered, including evicted ones.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> Vec<i64> {
        self.values.iter().map(|entry| entry.value).collect()
    }

    pub fn stats(&self) -> SampleStats {
        SampleStats::of(self.values.iter().map(|entry| entry.value))
    }
}

// ─── Summary statistics ──────────────────────────────────────────

/// Population statistics over the retained samples.
/// All zero when the reservoir is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub variance: f64,
}

impl SampleStats {
    pub fn of(values: impl Iterator<Item = i64> + Clone) -> Self {
        let mut n = 0u64;
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        let mut sum = 0f64;
        for v in values.clone() {
            n += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        if n == 0 {
            return Self::default();
        }

        let mean = sum / n as f64;
        let squares: f64 = values
            .map(|v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();

        Self {
            min,
            max,
            mean,
            variance: squares / n as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}
