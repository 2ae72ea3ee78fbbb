//! Error types for the pipeline

use coi_domain::RunId;
use thiserror::Error;

/// Infrastructure failures of the orchestrator
///
/// Step failures are recorded in the run log and never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading or appending the run log failed
    #[error("Run log error: {0}")]
    RunLog(String),

    /// No events exist for the run
    #[error("Unknown run: {0}")]
    UnknownRun(RunId),

    /// The run id is already in use
    #[error("Run {0} already exists")]
    DuplicateRun(RunId),

    /// The configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch task panicked or was aborted
    #[error("Task join error: {0}")]
    Join(String),
}
