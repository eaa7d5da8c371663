//! Fixed-timestep phase accumulator.
//!
//! A [`Stepper`] banks wall-clock time toward the next physics tick and keeps
//! a rolling record of how many ticks it produced over the last 1..=N frames.
//! Given a frame delta it proposes a [`PlannedStep`] (idle delta, tick count)
//! that stays consistent with a learned [`Rhythm`], then executes it with or
//! without clamping the accumulator into `[0, tick_period]`.

use crate::anomaly::{AnomalyKind, AnomalySink};
use crate::rhythm::Rhythm;

/// Number of trailing frame windows tracked for tick consistency.
///
/// Twelve is what 144 Hz rendering against 60 Hz physics needs; 85 Hz would
/// need 17.
pub const CONTROL_STEPS: usize = 12;

/// Relative phase jump above which a re-sync counts as drift.
const DRIFT_TOLERANCE: f64 = 1e-4;

/// Proposed advancement for one frame.
///
/// `tick_count` can be negative transiently (for example right after a
/// configuration change); [`Stepper::execute_step`] floors it to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedStep {
    /// Time handed to per-frame (idle) processing, in seconds
    pub idle_delta: f64,
    /// Number of fixed physics ticks to run
    pub tick_count: i64,
}

impl PlannedStep {
    /// Clamp the idle delta into `[min_delta, max_delta]`.
    ///
    /// The lower bound wins if the range is empty.
    pub fn clamp_idle_delta(&mut self, min_delta: f64, max_delta: f64) {
        if self.idle_delta < min_delta {
            self.idle_delta = min_delta;
        } else if self.idle_delta > max_delta {
            self.idle_delta = max_delta;
        }
    }
}

/// Phase accumulator with rolling tick history.
///
/// # RT-Safety
///
/// - Plain `Copy` value, no allocations
/// - Every operation is O([`CONTROL_STEPS`])
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stepper {
    /// Sum of ticks over the last `i + 1` frames
    history: [i64; CONTROL_STEPS],
    /// Time banked since the last full tick
    phase: f64,
}

impl Default for Stepper {
    fn default() -> Self {
        let mut history = [0i64; CONTROL_STEPS];
        for (window, slot) in (0i64..).zip(history.iter_mut()) {
            *slot = window;
        }
        Self {
            history,
            phase: 0.0,
        }
    }
}

impl Stepper {
    /// Create an accumulator at zero phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Banked time since the last tick, in seconds.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Tick totals over the trailing windows; entry `i` covers `i + 1` frames.
    #[inline]
    pub fn history(&self) -> &[i64; CONTROL_STEPS] {
        &self.history
    }

    /// Tick total over the last `frames` frames, if tracked.
    pub fn ticks_over(&self, frames: usize) -> Option<i64> {
        frames
            .checked_sub(1)
            .and_then(|index| self.history.get(index))
            .copied()
    }

    /// Propose a step for a frame of length `delta`.
    ///
    /// Starts from the naive tick count and nudges it toward the window of
    /// counts the rhythm considers typical, by at most `jitter_tolerance`
    /// ticks of banked time. If the rhythm and the recorded history disagree
    /// the naive count is returned unchanged.
    ///
    /// # Arguments
    ///
    /// * `delta` - Frame time to advance by, in seconds
    /// * `tick_period` - Physics tick length (`1 / ticks_per_second`)
    /// * `ticks_per_second` - Physics tick rate
    /// * `jitter_tolerance` - Fraction of a tick the count may be rounded by
    /// * `rhythm` - Learned typical tick counts
    /// * `sink` - Receives anomalies
    pub fn plan_step(
        &self,
        delta: f64,
        tick_period: f64,
        ticks_per_second: u32,
        jitter_tolerance: f64,
        rhythm: &Rhythm,
        sink: &dyn AnomalySink,
    ) -> PlannedStep {
        debug_assert!((tick_period * f64::from(ticks_per_second) - 1.0).abs() < 1e-6);

        let mut step = self.plan_naive(delta, ticks_per_second);

        let Some((min_typical, max_typical)) = self.typical_window(rhythm) else {
            // Inconsistent past, impossible to match. Take what we have.
            return step;
        };

        if min_typical < 0 || max_typical < 0 {
            sink.report(AnomalyKind::NegativeTypicalBound);
        }

        let exact_ticks = (self.phase + delta) * f64::from(ticks_per_second);

        if step.tick_count < min_typical {
            let max_possible = (exact_ticks + jitter_tolerance).floor() as i64;
            step.tick_count = if max_possible < min_typical {
                max_possible
            } else {
                min_typical
            };
        } else if step.tick_count > max_typical {
            let min_possible = (exact_ticks - jitter_tolerance).floor() as i64;
            step.tick_count = if min_possible > max_typical {
                min_possible
            } else {
                max_typical
            };
        }

        step
    }

    /// Propose a step using only the banked time, ignoring any rhythm.
    pub fn plan_naive(&self, delta: f64, ticks_per_second: u32) -> PlannedStep {
        let exact_ticks = (self.phase + delta) * f64::from(ticks_per_second);
        PlannedStep {
            idle_delta: delta,
            tick_count: exact_ticks.floor() as i64,
        }
    }

    /// Range of tick counts for this frame that keeps every trailing window
    /// within its typical value (or one above it).
    ///
    /// Returns `None` when no such count exists.
    fn typical_window(&self, rhythm: &Rhythm) -> Option<(i64, i64)> {
        let [first, longer @ ..] = rhythm.typical();
        let mut min_typical = *first;
        let mut max_typical = min_typical.saturating_add(1);

        for (accumulated, typical) in self.history.iter().zip(longer) {
            let remaining = typical.saturating_sub(*accumulated);
            if remaining > max_typical || remaining.saturating_add(1) < min_typical {
                return None;
            }
            min_typical = min_typical.max(remaining);
            max_typical = max_typical.min(remaining.saturating_add(1));
        }

        Some((min_typical, max_typical))
    }

    /// Apply `step`, keeping the phase within `[0, tick_period]`.
    ///
    /// `step` is adjusted in place so the reported idle delta stays
    /// consistent with the clamped phase, is at least `min_idle_delta`, and
    /// the tick count is never negative.
    pub fn execute_step(
        &mut self,
        step: &mut PlannedStep,
        tick_period: f64,
        min_idle_delta: f64,
        sink: &dyn AnomalySink,
    ) {
        if step.tick_count < 0 {
            // Only reachable if the clock ran backwards or the tolerance changed mid-flight.
            sink.report(AnomalyKind::NegativeTickCount);
            step.tick_count = 0;
        }

        self.phase += step.idle_delta - step.tick_count as f64 * tick_period;

        if self.phase < 0.0 {
            step.idle_delta -= self.phase;
            self.phase = 0.0;
        } else if self.phase > tick_period {
            step.idle_delta -= self.phase - tick_period;
            self.phase = tick_period;
        }

        if step.idle_delta < min_idle_delta {
            sink.report(AnomalyKind::IdleDeltaBelowMinimum);

            self.phase += step.idle_delta - min_idle_delta;
            step.idle_delta = min_idle_delta;

            if self.phase > tick_period {
                let extra_ticks = (self.phase / tick_period).floor() as i64;
                self.phase -= extra_ticks as f64 * tick_period;
                step.tick_count = step.tick_count.saturating_add(extra_ticks);
            } else if self.phase < 0.0 {
                self.phase = 0.0;
            }
        }

        self.accumulate_step(step.tick_count);
    }

    /// Apply `step` without any bounds enforcement.
    ///
    /// The phase may leave `[0, tick_period]`; only used for the reference
    /// accumulator that discovers the rhythm.
    pub fn execute_step_unclamped(&mut self, step: &PlannedStep, tick_period: f64) {
        self.phase += step.idle_delta - step.tick_count as f64 * tick_period;
        self.accumulate_step(step.tick_count);
    }

    /// Plan and execute an unclamped step in one call.
    pub fn advance_unclamped(
        &mut self,
        delta: f64,
        tick_period: f64,
        ticks_per_second: u32,
        jitter_tolerance: f64,
        rhythm: &Rhythm,
        sink: &dyn AnomalySink,
    ) -> PlannedStep {
        let step = self.plan_step(
            delta,
            tick_period,
            ticks_per_second,
            jitter_tolerance,
            rhythm,
            sink,
        );
        self.execute_step_unclamped(&step, tick_period);
        step
    }

    /// Re-anchor this phase `offset` ahead of `other`'s, modulo `tick_period`.
    ///
    /// Picks the representative closest to the current phase so the phase
    /// never jumps across the wraparound. Does nothing if `other` is
    /// saturated at either end of its range.
    pub fn sync_from(
        &mut self,
        other: &Stepper,
        tick_period: f64,
        offset: f64,
        sink: &dyn AnomalySink,
    ) {
        if other.phase <= 0.0 || other.phase >= tick_period {
            return;
        }

        let raw_phase = other.phase + offset;
        let wraps = ((self.phase - raw_phase) / tick_period + 0.5).floor();
        let new_phase = raw_phase + wraps * tick_period;

        if (new_phase - self.phase).abs() > DRIFT_TOLERANCE * tick_period {
            // Expected after a physics rate change.
            sink.report(AnomalyKind::AccumulatorDrift);
        }

        self.phase = new_phase;
    }

    /// Shift the window totals by one frame that produced `tick_count` ticks.
    fn accumulate_step(&mut self, tick_count: i64) {
        self.history.rotate_right(1);
        let [latest, older @ ..] = &mut self.history;
        *latest = tick_count;
        for total in older {
            *total = total.saturating_add(tick_count);
        }
    }
}
