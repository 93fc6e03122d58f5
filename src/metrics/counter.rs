use std::sync::atomic::{AtomicI64, Ordering};

/// Signed running total.
///
/// Lock-free; safe to share between any number of producer threads.
/// Saturates at `i64::MIN` / `i64::MAX` instead of wrapping.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc(&self, n: i64) {
        // The closure never returns None, so the update cannot fail
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_add(n))
            });
    }

    #[inline]
    pub fn dec(&self, n: i64) {
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(n))
            });
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Resets the total to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_inc_dec() {
        let c = Counter::new();
        c.inc(5);
        c.dec(2);
        c.inc(1);
        assert_eq!(c.count(), 4);

        c.dec(10);
        assert_eq!(c.count(), -6);

        c.clear();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn test_counter_saturates() {
        let c = Counter::new();
        c.inc(i64::MAX);
        c.inc(1);
        assert_eq!(c.count(), i64::MAX);

        c.clear();
        c.dec(i64::MAX);
        c.dec(2);
        assert_eq!(c.count(), i64::MIN);

        // Leaves the bound normally
        c.inc(1);
        assert_eq!(c.count(), i64::MIN + 1);
    }

    #[test]
    fn test_counter_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(Counter::new());
        let mut handles = vec![];

        for t in 0..8 {
            let c_clone = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    if t % 2 == 0 {
                        c_clone.inc(3);
                    } else {
                        c_clone.dec(1);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(c.count(), 4 * 1000 * 3 - 4 * 1000);
    }
}
