//! Prelude module for common scheduler types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the scheduler crate.

pub use crate::anomaly::{AnomalyKind, AnomalySink, AnomalySnapshot, CountingSink, LogOnceSink};
pub use crate::clock::{ManualClock, MonotonicClock, WallClock};
pub use crate::config::SchedulerConfig;
pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::sync::{FrameScheduler, FrameTiming};
pub use crate::variance::VarianceTracker;
