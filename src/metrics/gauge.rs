use std::sync::atomic::{AtomicI64, Ordering};

/// Instantaneous signed value; every update overwrites the previous one.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}
