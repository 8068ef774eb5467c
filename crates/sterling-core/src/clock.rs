//! Time source abstraction.
//!
//! The spec's scenarios (spec.md §8) are phrased in terms of exact
//! millisecond deltas from `now()`. Testing those against wall-clock time
//! would make the test suite slow and flaky, so every component that reads
//! the time takes a `&dyn Clock` instead of calling `SystemTime::now()`
//! directly — the same shape as injecting a fake RNG or a fake filesystem.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests. Starts at 0 unless constructed with
/// [`FakeClock::at`].
#[derive(Clone, Debug, Default)]
pub struct FakeClock(Arc<Mutex<i64>>);

impl FakeClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(0)))
    }

    pub fn at(millis: i64) -> Self {
        Self(Arc::new(Mutex::new(millis)))
    }

    pub fn advance(&self, delta_ms: i64) {
        let mut guard = self.0.lock().unwrap();
        *guard += delta_ms;
    }

    pub fn set(&self, millis: i64) {
        *self.0.lock().unwrap() = millis;
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
        clock.set(0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn system_clock_is_positive() {
        assert!(SystemClock.now_ms() > 0);
    }
}
