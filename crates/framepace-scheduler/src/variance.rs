//! Rolling jitter estimate from frame steps and scheduler deficits.
//!
//! Not used by [`FrameScheduler::advance`](crate::FrameScheduler::advance);
//! feed it from the host loop when a jitter figure is wanted for diagnostics.

/// Number of samples in the rolling window.
pub const VARIANCE_STEPS: usize = 12;

/// Smallest variance ever reported.
const MIN_VARIANCE: f64 = 1e-6;

/// Upper-bound estimate of frame time jitter.
///
/// Both the span of recent frame steps and the span of recent deficits
/// overestimate the true jitter, so the larger of the two is a safe bound.
/// The estimate decays slowly between bursts rather than collapsing to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceTracker {
    steps: [f64; VARIANCE_STEPS],
    deficits: [f64; VARIANCE_STEPS],
    cursor: usize,
    variance: f64,
}

impl Default for VarianceTracker {
    fn default() -> Self {
        Self {
            steps: [0.0; VARIANCE_STEPS],
            deficits: [0.0; VARIANCE_STEPS],
            cursor: 0,
            variance: 0.0,
        }
    }
}

impl VarianceTracker {
    /// Create a tracker with an empty window and a zero estimate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's step and deficit, then refresh the estimate.
    ///
    /// The stored estimate never exceeds `max_variance`.
    pub fn collect(&mut self, step: f64, deficit: f64, max_variance: f64) {
        if let (Some(step_slot), Some(deficit_slot)) = (
            self.steps.get_mut(self.cursor),
            self.deficits.get_mut(self.cursor),
        ) {
            *step_slot = step;
            *deficit_slot = deficit;
        }
        self.cursor = (self.cursor + 1) % VARIANCE_STEPS;

        self.variance = self.compute_variance().min(max_variance);
    }

    /// Current estimate, in seconds.
    #[inline]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Estimate for the current window, bounded below by the decayed previous one.
    pub fn compute_variance(&self) -> f64 {
        let (min_step, max_step) = span(&self.steps);
        let (min_deficit, max_deficit) = span(&self.deficits);

        let raw_variance = MIN_VARIANCE
            .max(max_step - min_step)
            .max(max_deficit - min_deficit);

        let window = VARIANCE_STEPS as f64;
        let decayed = self.variance * window / (window + 0.2);
        let stepped_down = self.variance - min_step / (window + 1.0);
        let deficit_floor = max_deficit.max(-min_deficit);
        let floor = deficit_floor.min(decayed.max(stepped_down));

        raw_variance.max(floor)
    }

    /// Clear the window and the estimate.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn span(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &value| {
            (min.min(value), max.max(value))
        })
}
