//! Frame delta spike filter.
//!
//! Smooths one raw frame delta at a time. A delta larger than anything seen
//! in the last [`FILTER_STEPS`] frames is capped at that maximum and the
//! excess is carried into the following frames as a deficit. Extreme stalls
//! (more than twice the recent maximum) are released in halves.
//!
//! The sum of filtered outputs plus the carried deficit always equals the sum
//! of raw inputs, so no elapsed time is lost or counted twice.

/// Number of recent raw deltas considered.
pub const FILTER_STEPS: usize = 4;

/// Initial value of the sample buffer; keeps the filter inert until warmed up.
pub const SPIKE_SENTINEL: f64 = 1e8;

/// Spike filter state.
///
/// # RT-Safety
///
/// - Fixed-size state, no allocations
/// - O([`FILTER_STEPS`]) per call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeFilter {
    /// Input time not yet returned to the caller
    deficit: f64,
    /// Recent raw deltas (ring buffer)
    deltas: [f64; FILTER_STEPS],
    /// Next slot in `deltas`
    cursor: usize,
}

impl Default for SpikeFilter {
    fn default() -> Self {
        Self {
            deficit: 0.0,
            deltas: [SPIKE_SENTINEL; FILTER_STEPS],
            cursor: 0,
        }
    }
}

impl SpikeFilter {
    /// Create a filter that passes input through until warmed up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one raw frame delta, return the filtered delta.
    ///
    /// Must be called exactly once per frame with the newest delta.
    pub fn filter(&mut self, raw_delta: f64) -> f64 {
        let max_recorded = self.max_recorded();

        if let Some(slot) = self.deltas.get_mut(self.cursor) {
            *slot = raw_delta;
        }
        self.cursor = (self.cursor + 1) % FILTER_STEPS;

        let adjusted = raw_delta + self.deficit;

        if adjusted <= max_recorded {
            self.deficit = 0.0;
            return adjusted;
        }

        // Not exceptionally large: cap at the recent maximum, spread the rest.
        if adjusted <= 2.0 * max_recorded {
            self.deficit = adjusted - max_recorded;
            return max_recorded;
        }

        // Stall: apply half now, keep half for later.
        self.deficit = adjusted * 0.5;
        self.deficit
    }

    /// Largest raw delta among the recent samples.
    pub fn max_recorded(&self) -> f64 {
        self.deltas.iter().copied().fold(0.0, f64::max)
    }

    /// Time carried into the next call.
    #[inline]
    pub fn deficit(&self) -> f64 {
        self.deficit
    }

    /// Return to the inert initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
