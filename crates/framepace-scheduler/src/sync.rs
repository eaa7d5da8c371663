//! Frame scheduler: reconciles wall-clock frame time with fixed physics ticks.
//!
//! Each frame the scheduler decides how many fixed-size physics ticks to run
//! and what idle delta to report for animation, keeping tick counts steady
//! under vsync jitter while never letting the reported time drift from the
//! measured time by more than the configured tolerance.
//!
//! Two phase accumulators run side by side. The reference accumulator is
//! never clamped and always plans with a tolerance of 0.5; its only job is to
//! teach the [`Rhythm`] what tick counts are typical. The live accumulator
//! plans with the configured tolerance against that rhythm and produces the
//! output. After every frame the reference is re-anchored half a tick ahead
//! of the live one.

use crate::anomaly::{AnomalyKind, AnomalySink, AnomalySnapshot, LogOnceSink};
use crate::clock::WallClock;
use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::rhythm::Rhythm;
use crate::spike_filter::SpikeFilter;
use crate::stepper::Stepper;
use tracing::{debug, trace};

/// Tolerance used by the reference accumulator.
///
/// The largest value that never bounces between the edges of the
/// consistency window, which makes a stable rhythm most likely.
pub const REFERENCE_JITTER_TOLERANCE: f64 = 0.5;

/// Absolute floor for the reported idle delta, in seconds.
pub const MIN_IDLE_DELTA: f64 = 1e-6;

/// Largest raw frame delta accepted, in seconds. Longer frames are
/// shortened to this and reported as [`AnomalyKind::DeltaOutOfRange`].
pub const MAX_FRAME_DELTA: f64 = 3600.0;

/// The rhythm must agree over more than this many windows before it is used
/// to clamp the idle delta.
pub const MIN_CONFIDENT_WINDOWS: usize = 3;

/// Fraction of the frame delta the idle delta may never fall below.
const MIN_IDLE_FRACTION: f64 = 0.25;

const USEC_PER_SEC: f64 = 1_000_000.0;

/// Result of one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Time to hand to idle (animation, rendering) processing, in seconds
    pub idle_delta: f64,
    /// Number of fixed physics ticks to run before rendering
    pub tick_count: u32,
    /// How far into the next physics tick rendering should interpolate.
    ///
    /// Normally in `[0, 1)`; exactly 1.0 when the accumulator is saturated
    /// at a full tick (for example while catching up after a stall).
    pub interpolation_fraction: f64,
}

/// Per-frame scheduler.
///
/// Owned and driven by a single main loop; call [`init`](Self::init) once,
/// then [`set_wall_clock_sample`](Self::set_wall_clock_sample) and
/// [`advance`](Self::advance) every frame.
///
/// # RT-Safety
///
/// - No allocations after construction
/// - `advance` is O([`CONTROL_STEPS`](crate::CONTROL_STEPS)) and never fails
///
/// # Example
///
/// ```
/// use framepace_scheduler::{FrameScheduler, SchedulerConfig};
///
/// let mut scheduler = FrameScheduler::new(SchedulerConfig::default())?;
/// scheduler.init(0);
///
/// let mut now_usec = 0;
/// for _ in 0..120 {
///     now_usec += 16_667;
///     scheduler.set_wall_clock_sample(now_usec);
///     let frame = scheduler.advance(1.0 / 60.0, 60);
///     for _ in 0..frame.tick_count {
///         // physics step
///     }
///     // render with frame.idle_delta and frame.interpolation_fraction
/// }
/// # Ok::<(), framepace_scheduler::SchedulerError>(())
/// ```
#[derive(Debug)]
pub struct FrameScheduler<S: AnomalySink = LogOnceSink> {
    config: SchedulerConfig,

    /// Accumulator producing the output
    live: Stepper,

    /// Unclamped accumulator the rhythm learns from
    reference: Stepper,

    rhythm: Rhythm,

    spike_filter: SpikeFilter,

    /// Time measured but not yet reported, carried into the next frame
    time_deficit: f64,

    last_sample_usec: u64,
    current_sample_usec: u64,
    initialized: bool,

    sink: S,
}

impl FrameScheduler<LogOnceSink> {
    /// Create a scheduler that logs each anomaly kind once.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        Self::with_sink(config, LogOnceSink::new())
    }
}

impl<S: AnomalySink> FrameScheduler<S> {
    /// Create a scheduler reporting anomalies to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn with_sink(config: SchedulerConfig, sink: S) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            live: Stepper::new(),
            reference: Stepper::new(),
            rhythm: Rhythm::new(),
            spike_filter: SpikeFilter::new(),
            time_deficit: 0.0,
            last_sample_usec: 0,
            current_sample_usec: 0,
            initialized: false,
            sink,
        })
    }

    /// Start scheduling from wall-clock reading `sample_usec`.
    ///
    /// The first [`advance`](Self::advance) afterwards sees zero elapsed
    /// time unless a newer sample is set. Calling this again restarts the
    /// scheduler from scratch.
    pub fn init(&mut self, sample_usec: u64) {
        self.reset();

        let tick_period = self.config.tick_period();
        self.reference.advance_unclamped(
            tick_period * 0.5,
            tick_period,
            self.config.physics_ticks_per_second,
            0.0,
            &self.rhythm,
            &self.sink,
        );

        self.last_sample_usec = sample_usec;
        self.current_sample_usec = sample_usec;
        self.initialized = true;

        debug!(
            sample_usec,
            physics_ticks_per_second = self.config.physics_ticks_per_second,
            jitter_tolerance = self.config.jitter_tolerance,
            "Frame scheduler initialized"
        );
    }

    /// Record the latest wall-clock reading in microseconds.
    #[inline]
    pub fn set_wall_clock_sample(&mut self, sample_usec: u64) {
        self.current_sample_usec = sample_usec;
    }

    /// Force a constant frame rate, or return to measured time with `None`.
    ///
    /// A rate of zero is reported as [`AnomalyKind::InvalidFixedFps`] and
    /// treated as `None`.
    pub fn set_fixed_fps(&mut self, fixed_fps: Option<u32>) {
        self.config.fixed_fps = match fixed_fps {
            Some(0) => {
                self.sink.report(AnomalyKind::InvalidFixedFps);
                None
            }
            other => other,
        };
    }

    /// Change the jitter tolerance between frames.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidJitterTolerance`] outside `[0, 1]`;
    /// the previous value is kept.
    pub fn set_jitter_tolerance(&mut self, jitter_tolerance: f64) -> SchedulerResult {
        let updated = self.config.clone().with_jitter_tolerance(jitter_tolerance);
        updated.validate()?;
        self.config = updated;
        Ok(())
    }

    /// Change the physics tick rate between frames.
    ///
    /// Tick history recorded at the old rate is inconsistent with the new
    /// one; the rhythm corrects itself within a window's worth of frames.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTickRate`] for zero; the previous
    /// rate is kept.
    pub fn set_physics_rate(&mut self, ticks_per_second: u32) -> SchedulerResult {
        if ticks_per_second == 0 {
            return Err(SchedulerError::InvalidTickRate(ticks_per_second));
        }
        self.config.physics_ticks_per_second = ticks_per_second;
        Ok(())
    }

    /// Schedule one frame from the wall-clock samples.
    ///
    /// Elapsed time is the difference between the current and the previous
    /// sample. A sample older than the previous one counts as zero elapsed
    /// time.
    ///
    /// # Arguments
    ///
    /// * `tick_period` - Physics tick length in seconds
    /// * `ticks_per_second` - Physics tick rate, `1 / tick_period`
    pub fn advance(&mut self, tick_period: f64, ticks_per_second: u32) -> FrameTiming {
        self.ensure_initialized();
        let elapsed = self.take_elapsed();
        self.advance_delta(tick_period, ticks_per_second, elapsed)
    }

    /// Schedule one frame at the configured physics rate.
    pub fn advance_with_config(&mut self) -> FrameTiming {
        let tick_period = self.config.tick_period();
        let ticks_per_second = self.config.physics_ticks_per_second;
        self.advance(tick_period, ticks_per_second)
    }

    /// Sample `clock` and schedule one frame at the configured physics rate.
    pub fn advance_from_clock<C: WallClock + ?Sized>(&mut self, clock: &C) -> FrameTiming {
        self.set_wall_clock_sample(clock.now_usec());
        self.advance_with_config()
    }

    /// Schedule one frame from an already measured delta, in seconds.
    pub fn advance_delta(
        &mut self,
        tick_period: f64,
        ticks_per_second: u32,
        raw_delta: f64,
    ) -> FrameTiming {
        self.ensure_initialized();

        let raw_delta = if !raw_delta.is_finite() {
            self.sink.report(AnomalyKind::DeltaOutOfRange);
            0.0
        } else if raw_delta > MAX_FRAME_DELTA {
            self.sink.report(AnomalyKind::DeltaOutOfRange);
            MAX_FRAME_DELTA
        } else if raw_delta <= 0.0 {
            self.sink.report(AnomalyKind::NonPositiveDelta);
            0.0
        } else {
            raw_delta
        };

        let fixed_delta = self.config.fixed_delta();
        let jitter_tolerance = self.config.jitter_tolerance;

        let delta = match fixed_delta {
            Some(fixed) => fixed,
            None if jitter_tolerance > 0.0 => self.spike_filter.filter(raw_delta),
            None => raw_delta,
        };

        self.reference.advance_unclamped(
            delta,
            tick_period,
            ticks_per_second,
            REFERENCE_JITTER_TOLERANCE,
            &self.rhythm,
            &self.sink,
        );
        self.rhythm.update(&self.reference);

        let min_idle_delta = (delta * MIN_IDLE_FRACTION).max(MIN_IDLE_DELTA);

        let (mut step, owed) = if fixed_delta.is_some() {
            // Constant idle delta; nothing is carried between frames.
            (self.live.plan_naive(delta, ticks_per_second), delta)
        } else {
            let owed = delta + self.time_deficit;
            let mut step = self.live.plan_step(
                owed,
                tick_period,
                ticks_per_second,
                jitter_tolerance,
                &self.rhythm,
                &self.sink,
            );

            let average = self.rhythm.average_ticks_per_frame();
            if average.confident_windows > MIN_CONFIDENT_WINDOWS {
                step.clamp_idle_delta(
                    average.min_rate * tick_period,
                    average.max_rate * tick_period,
                );
            }

            let max_clock_deviation = jitter_tolerance * tick_period;
            step.clamp_idle_delta(owed - max_clock_deviation, owed + max_clock_deviation);

            (step, owed)
        };

        self.live
            .execute_step(&mut step, tick_period, min_idle_delta, &self.sink);

        self.reference
            .sync_from(&self.live, tick_period, tick_period * 0.5, &self.sink);

        self.time_deficit = if fixed_delta.is_some() {
            0.0
        } else {
            owed - step.idle_delta
        };

        let timing = FrameTiming {
            idle_delta: step.idle_delta,
            tick_count: u32::try_from(step.tick_count).unwrap_or(u32::MAX),
            interpolation_fraction: (self.live.phase() * f64::from(ticks_per_second))
                .clamp(0.0, 1.0),
        };

        trace!(
            raw_delta,
            idle_delta = timing.idle_delta,
            tick_count = timing.tick_count,
            interpolation_fraction = timing.interpolation_fraction,
            time_deficit = self.time_deficit,
            "Frame scheduled"
        );

        timing
    }

    /// Forget all learned state and return to the uninitialized state.
    ///
    /// Configuration and the anomaly sink are kept.
    pub fn reset(&mut self) {
        self.live = Stepper::new();
        self.reference = Stepper::new();
        self.rhythm.reset();
        self.spike_filter.reset();
        self.time_deficit = 0.0;
        self.last_sample_usec = self.current_sample_usec;
        self.initialized = false;
    }

    /// Time carried into the next frame, in seconds.
    #[inline]
    pub fn time_deficit(&self) -> f64 {
        self.time_deficit
    }

    /// Banked time of the live accumulator.
    #[inline]
    pub fn live_phase(&self) -> f64 {
        self.live.phase()
    }

    /// Banked time of the reference accumulator.
    #[inline]
    pub fn reference_phase(&self) -> f64 {
        self.reference.phase()
    }

    /// Learned tick rhythm.
    #[inline]
    pub fn rhythm(&self) -> &Rhythm {
        &self.rhythm
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Whether [`init`](Self::init) has run.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Anomaly counts reported so far.
    pub fn anomalies(&self) -> AnomalySnapshot {
        self.sink.snapshot()
    }

    /// The anomaly sink.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            debug!(
                sample_usec = self.current_sample_usec,
                "Frame scheduler advanced before init, initializing from current sample"
            );
            self.init(self.current_sample_usec);
        }
    }

    /// Seconds since the previous sample; moves the previous sample forward.
    fn take_elapsed(&mut self) -> f64 {
        let current = self.current_sample_usec;
        let elapsed_usec = match current.checked_sub(self.last_sample_usec) {
            Some(elapsed) => elapsed,
            None => {
                self.sink.report(AnomalyKind::ClockWentBackwards);
                0
            }
        };
        self.last_sample_usec = current;
        elapsed_usec as f64 / USEC_PER_SEC
    }
}
