//! Learned typical tick counts per frame window.

use crate::stepper::{CONTROL_STEPS, Stepper};

/// Typical number of physics ticks over the last `i + 1` frames.
///
/// For each window the real count is kept in `[typical[i], typical[i] + 1]`
/// whenever possible. The bounds only move when an observed count falls
/// outside them, so a steady frame rate settles after a few frames and
/// brief jitter does not disturb it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rhythm {
    typical: [i64; CONTROL_STEPS],
}

/// Rate bounds derived from the rhythm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageRate {
    /// Lower bound on average ticks per frame
    pub min_rate: f64,
    /// Upper bound on average ticks per frame
    pub max_rate: f64,
    /// Number of leading windows that agree on the bounds
    pub confident_windows: usize,
}

impl Rhythm {
    /// Create an untrained rhythm (all bounds zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bounds per window.
    #[inline]
    pub fn typical(&self) -> &[i64; CONTROL_STEPS] {
        &self.typical
    }

    /// Learn from the latest tick history of an unclamped reference accumulator.
    pub fn update(&mut self, reference: &Stepper) {
        for (typical, &actual) in self.typical.iter_mut().zip(reference.history()) {
            if actual < *typical {
                *typical = actual;
            } else if actual.saturating_sub(1) > *typical {
                *typical = actual.saturating_sub(1);
            }
        }
    }

    /// Tightest average tick rate consistent with every window so far.
    ///
    /// Windows are scanned shortest first. Scanning stops at the first window
    /// whose bounds contradict the ones accumulated before it;
    /// `confident_windows` reports how many windows agreed.
    pub fn average_ticks_per_frame(&self) -> AverageRate {
        let [first, longer @ ..] = &self.typical;
        let mut min_rate = *first as f64;
        let mut max_rate = first.saturating_add(1) as f64;

        for (offset, &typical) in longer.iter().enumerate() {
            let frames = (offset + 2) as f64;
            let window_min = typical as f64 / frames;
            let window_max = typical.saturating_add(1) as f64 / frames;

            if window_max < min_rate || window_min > max_rate {
                return AverageRate {
                    min_rate,
                    max_rate,
                    confident_windows: offset + 1,
                };
            }

            min_rate = min_rate.max(window_min);
            max_rate = max_rate.min(window_max);
        }

        AverageRate {
            min_rate,
            max_rate,
            confident_windows: CONTROL_STEPS,
        }
    }

    /// Forget everything learned.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::CountingSink;
    use crate::stepper::PlannedStep;

    const TICK: f64 = 1.0 / 60.0;

    fn run_reference(pattern: &[i64], frames: usize) -> (Stepper, Rhythm) {
        let mut reference = Stepper::new();
        let mut rhythm = Rhythm::new();
        for &ticks in pattern.iter().cycle().take(frames) {
            let step = PlannedStep {
                idle_delta: ticks as f64 * TICK,
                tick_count: ticks,
            };
            reference.execute_step_unclamped(&step, TICK);
            rhythm.update(&reference);
        }
        (reference, rhythm)
    }

    #[test]
    fn test_untrained_rhythm() {
        let rhythm = Rhythm::new();
        assert!(rhythm.typical().iter().all(|&typical| typical == 0));
    }

    #[test]
    fn test_converges_to_steady_rate() {
        let (_, rhythm) = run_reference(&[1], 40);
        for (window, &typical) in rhythm.typical().iter().enumerate() {
            assert_eq!(typical, window as i64, "window {window}");
        }

        let rate = rhythm.average_ticks_per_frame();
        assert_eq!(rate.confident_windows, CONTROL_STEPS);
        assert!(rate.min_rate <= 1.0 && rate.max_rate >= 1.0);
    }

    #[test]
    fn test_history_stays_within_bounds() {
        // Two ticks every three frames, as with 90 Hz rendering over 60 Hz physics.
        let (reference, rhythm) = run_reference(&[1, 0, 1], 60);
        for (window, (&actual, &typical)) in reference
            .history()
            .iter()
            .zip(rhythm.typical())
            .enumerate()
        {
            assert!(
                actual >= typical && actual <= typical + 1,
                "window {window}: actual {actual}, typical {typical}"
            );
        }
    }

    #[test]
    fn test_update_lowers_bound_on_shortfall() {
        let (mut reference, mut rhythm) = run_reference(&[2], 40);
        assert_eq!(rhythm.typical()[0], 1);
        assert_eq!(rhythm.typical()[1], 3);

        let sink = CountingSink::new();
        let mut step = PlannedStep {
            idle_delta: 0.0,
            tick_count: 0,
        };
        reference.execute_step(&mut step, TICK, 0.0, &sink);
        rhythm.update(&reference);

        // A frame without ticks pulls the short windows' bounds down.
        assert_eq!(rhythm.typical()[0], 0);
        assert_eq!(rhythm.typical()[1], 2);
    }

    #[test]
    fn test_average_detects_contradiction() {
        let mut rhythm = Rhythm::new();
        rhythm.typical = [0, 1, 2, 9, 4, 5, 6, 7, 8, 9, 10, 11];

        let rate = rhythm.average_ticks_per_frame();
        assert_eq!(rate.confident_windows, 3);
        assert!(rate.max_rate <= 1.0);
    }

    #[test]
    fn test_reset() {
        let (_, mut rhythm) = run_reference(&[2], 20);
        rhythm.reset();
        assert_eq!(rhythm, Rhythm::new());
    }
}
