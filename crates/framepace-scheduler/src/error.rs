//! Error types for the scheduler crate.
//!
//! Only construction and configuration can fail. The per-frame path never
//! returns an error; anomalies detected there are reported through
//! [`AnomalySink`](crate::anomaly::AnomalySink) and corrected in place.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// Physics tick rate of zero
    #[error("Physics tick rate must be positive, got {0}")]
    InvalidTickRate(u32),

    /// Jitter tolerance outside `[0, 1]` or not finite
    #[error("Jitter tolerance must be a finite value in [0, 1], got {0}")]
    InvalidJitterTolerance(f64),

    /// Fixed frame rate of zero
    #[error("Fixed fps must be positive, got {0}")]
    InvalidFixedFps(u32),

    /// Configuration document could not be parsed
    #[error("Invalid scheduler configuration: {0}")]
    Config(String),
}

/// Result type for configuration operations.
pub type SchedulerResult<T = ()> = Result<T, SchedulerError>;
