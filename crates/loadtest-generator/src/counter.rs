//! Shared count of generated events.

use std::sync::atomic::{AtomicU64, Ordering};

/// Count of events generated across every worker.
///
/// Shared through an `Arc`; used for progress reporting and the final
/// summary only.
#[derive(Debug, Default)]
pub struct EventCounter {
    count: AtomicU64,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new total.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_returns_new_total() {
        let counter = EventCounter::new();
        assert_eq!(counter.snapshot(), 0);
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.snapshot(), 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let counter = Arc::new(EventCounter::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.snapshot(), 4000);
    }
}
