//! Time sources for the rate limiter.

use std::time::Instant;

#[cfg(test)]
pub use manual::ManualClock;

/// A source of timestamps in nanoseconds.
///
/// Implementors must be thread-safe. Timestamps only need to be comparable
/// with other timestamps from the same clock.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds.
    fn now(&self) -> u64;
}

/// Monotonic clock measuring nanoseconds since its creation.
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
    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}
