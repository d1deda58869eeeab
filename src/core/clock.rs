//! The node's logical clock.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::core::message;

/// A local event counter, incremented once per message sent and once per message received.
///
/// The clock is stamped into outgoing messages but a remote clock value is never compared or
/// merged with it, it is purely informational. Clones share the same counter.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    value: Arc<AtomicU64>,
}

impl Clock {
    /// Creates a new clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter and returns the new value.
    pub fn tick(&self) -> message::ClockValue {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current value without incrementing it.
    pub fn value(&self) -> message::ClockValue {
        self.value.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn tick() {
        let clock = Clock::new();
        assert_eq!(clock.value(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.value(), 2);
    }

    #[test]
    fn clones_share_the_counter() {
        let clock = Clock::new();
        let clone = clock.clone();

        clone.tick();
        assert_eq!(clock.value(), 1);
    }

    #[test]
    fn concurrent_ticks_are_not_lost() {
        const THREADS: u64 = 8;
        const TICKS: u64 = 1000;

        let clock = Clock::new();
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let clock = clock.clone();
                thread::spawn(move || {
                    for _ in 0..TICKS {
                        clock.tick();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(clock.value(), THREADS * TICKS);
    }
}
