//! Frame pacing for fixed-timestep simulation loops.
//!
//! Reconciles three clocks once per rendered frame: the variable wall-clock
//! frame time, a fixed physics tick, and the idle delta handed to animation.
//! It includes:
//!
//! - **SpikeFilter**: Caps sudden frame time spikes and releases the excess over later frames
//! - **Stepper**: Phase accumulator with rolling tick-count history
//! - **Rhythm**: Learned typical tick counts used as a consistency prior
//! - **FrameScheduler**: Per-frame tick count and idle delta decisions
//! - **VarianceTracker**: Optional rolling jitter estimate for diagnostics
//!
//! # RT-Safety Guarantees
//!
//! - **No heap allocations** after construction
//! - **Bounded execution time**: every per-frame call is O(window size)
//! - **Never fails per frame**: anomalies are clamped and reported to an [`AnomalySink`]
//!
//! # Example
//!
//! ```
//! use framepace_scheduler::{FrameScheduler, SchedulerConfig};
//!
//! let config = SchedulerConfig::new().with_physics_ticks_per_second(60);
//! let mut scheduler = FrameScheduler::new(config)?;
//! scheduler.init(0);
//!
//! scheduler.set_wall_clock_sample(16_667);
//! let frame = scheduler.advance_with_config();
//! assert!(frame.idle_delta >= 0.0);
//! # Ok::<(), framepace_scheduler::SchedulerError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod anomaly;
pub mod clock;
pub mod config;
pub mod error;
pub mod rhythm;
pub mod spike_filter;
pub mod stepper;
pub mod sync;
pub mod variance;

pub mod prelude;

pub use anomaly::{
    AnomalyCounters, AnomalyKind, AnomalySink, AnomalySnapshot, CountingSink, LogOnceSink,
};
pub use clock::{ManualClock, MonotonicClock, WallClock};
pub use config::{MAX_STABLE_JITTER_TOLERANCE, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use rhythm::{AverageRate, Rhythm};
pub use spike_filter::{FILTER_STEPS, SPIKE_SENTINEL, SpikeFilter};
pub use stepper::{CONTROL_STEPS, PlannedStep, Stepper};
pub use sync::{
    FrameScheduler, FrameTiming, MAX_FRAME_DELTA, MIN_CONFIDENT_WINDOWS, MIN_IDLE_DELTA,
    REFERENCE_JITTER_TOLERANCE,
};
pub use variance::{VARIANCE_STEPS, VarianceTracker};
