//! Wall clocks used by the synthetic photo timeline and the scheduler.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::core::time::Millis;

/// Source of monotonic wall-clock time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock backed by `Instant`, zeroed at construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Manually advanced clock. Clones share the same time.
///
/// Deterministic hosts (and the tests) drive the whole session through this:
/// advance the clock, then call `tick()`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta` milliseconds
    pub fn advance(&self, delta: Millis) {
        self.now.set(self.now.get() + delta.max(0));
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, now: Millis) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
    }

    #[test]
    fn test_manual_clock_monotonic() {
        let clock = ManualClock::new();
        clock.set(1_000);
        clock.set(500);
        clock.advance(-20);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn test_system_clock_starts_near_zero() {
        let clock = SystemClock::new();
        assert!(clock.now_ms() < 1_000);
    }
}
