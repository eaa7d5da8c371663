//! Error types for framepacectl

use framepace_scheduler::SchedulerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid trace: {0}")]
    InvalidTrace(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
