//! Injectable time source.
//!
//! Every engine that reasons about trailing windows (Trajectory Hash, Capital
//! Velocity, Cognitive Sever) takes a `&dyn Clock` instead of calling
//! `Instant::now()` directly, so tests can advance time deterministically.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Monotonic time since an arbitrary, implementation-defined origin.
    fn now(&self) -> Duration;
}

/// Production clock, anchored at construction time.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Deterministic clock for tests: starts at zero, advances only when told.
pub struct TestClock {
    current: Mutex<Duration>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set(&self, d: Duration) {
        *self.current.lock().expect("test clock poisoned") = d;
    }

    pub fn advance(&self, d: Duration) {
        let mut guard = self.current.lock().expect("test clock poisoned");
        *guard += d;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Duration {
        *self.current.lock().expect("test clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_monotonically() {
        let clock = TestClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), Duration::from_secs(5));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }
}
