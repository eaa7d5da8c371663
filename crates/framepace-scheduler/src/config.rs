//! Scheduler configuration.

use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest jitter tolerance that can never make tick counts bounce between
/// the two edges of the consistency window.
pub const MAX_STABLE_JITTER_TOLERANCE: f64 = 0.5;

/// Scheduler configuration.
///
/// Passed explicitly to the scheduler instead of being looked up from
/// process-wide state. Can be deserialized from JSON; missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Desired physics ticks per second.
    pub physics_ticks_per_second: u32,

    /// Fraction of a tick period the reported idle delta may deviate from
    /// measured wall-clock time in exchange for smoother tick counts.
    ///
    /// Zero disables spike filtering and rhythm-based idle clamping.
    pub jitter_tolerance: f64,

    /// Forced constant frame rate, bypassing wall-clock measurement.
    pub fixed_fps: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            physics_ticks_per_second: 60,
            jitter_tolerance: MAX_STABLE_JITTER_TOLERANCE,
            fixed_fps: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with defaults (60 Hz physics, 0.5 tolerance).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the physics tick rate.
    pub fn with_physics_ticks_per_second(mut self, ticks_per_second: u32) -> Self {
        self.physics_ticks_per_second = ticks_per_second;
        self
    }

    /// Set the jitter tolerance.
    pub fn with_jitter_tolerance(mut self, jitter_tolerance: f64) -> Self {
        self.jitter_tolerance = jitter_tolerance;
        self
    }

    /// Set or clear the fixed frame rate.
    pub fn with_fixed_fps(mut self, fixed_fps: Option<u32>) -> Self {
        self.fixed_fps = fixed_fps;
        self
    }

    /// Duration of one physics tick in seconds.
    ///
    /// Returns `0.0` for a zero tick rate; [`validate`](Self::validate)
    /// rejects such configurations.
    pub fn tick_period(&self) -> f64 {
        if self.physics_ticks_per_second == 0 {
            return 0.0;
        }
        1.0 / f64::from(self.physics_ticks_per_second)
    }

    /// Constant idle delta forced by the fixed frame rate, if any.
    pub fn fixed_delta(&self) -> Option<f64> {
        self.fixed_fps
            .filter(|&fps| fps > 0)
            .map(|fps| 1.0 / f64::from(fps))
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> SchedulerResult {
        if self.physics_ticks_per_second == 0 {
            return Err(SchedulerError::InvalidTickRate(self.physics_ticks_per_second));
        }

        if !self.jitter_tolerance.is_finite() || !(0.0..=1.0).contains(&self.jitter_tolerance) {
            return Err(SchedulerError::InvalidJitterTolerance(self.jitter_tolerance));
        }

        if self.fixed_fps == Some(0) {
            return Err(SchedulerError::InvalidFixedFps(0));
        }

        if self.jitter_tolerance > MAX_STABLE_JITTER_TOLERANCE {
            debug!(
                jitter_tolerance = self.jitter_tolerance,
                "Jitter tolerance above 0.5 may let tick counts oscillate"
            );
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] if the document is malformed, or a
    /// validation error for out-of-range values.
    pub fn from_json(json: &str) -> SchedulerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
