use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Source of "now" for a runner, in seconds on an arbitrary monotonic axis.
///
/// Only differences between readings matter. Implementations must never go
/// backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Logical clock that only moves when told to.
///
/// Share it with a runner through an `Arc` and step it from the driving
/// thread; the frame loop sees the new reading on its next wake-up.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Clock reading `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `secs`. Negative steps are ignored.
    pub fn advance(&self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner) += secs;
        }
    }

    /// Jump to `secs` if that is later than the current reading.
    pub fn set(&self, secs: f64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if secs.is_finite() && secs > *now {
            *now = secs;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runner/clock.rs"]
mod tests;
