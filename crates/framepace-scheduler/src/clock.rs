//! Wall-clock sources.
//!
//! The scheduler only consumes microsecond samples; these types let a host
//! loop (or a trace replay) supply them.

use core::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic microsecond clock.
pub trait WallClock {
    /// Current reading in microseconds.
    fn now_usec(&self) -> u64;
}

/// Clock backed by [`Instant`], counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for MonotonicClock {
    fn now_usec(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Manually driven clock for tests and trace replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_usec: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_usec`.
    pub fn new(start_usec: u64) -> Self {
        Self {
            now_usec: AtomicU64::new(start_usec),
        }
    }

    /// Jump to an absolute reading. May move backwards.
    pub fn set(&self, usec: u64) {
        self.now_usec.store(usec, Ordering::Relaxed);
    }

    /// Move forward by `usec`, saturating at `u64::MAX`.
    pub fn advance(&self, usec: u64) {
        let now = self.now_usec.load(Ordering::Relaxed);
        self.now_usec
            .store(now.saturating_add(usec), Ordering::Relaxed);
    }
}

impl WallClock for ManualClock {
    fn now_usec(&self) -> u64 {
        self.now_usec.load(Ordering::Relaxed)
    }
}
