//! Error types for report building and storage

use coi_domain::traits::Transient;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or storing a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// The verdict set cannot be written in the requested format
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Writing the report failed
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Serialization(e.to_string())
    }
}

impl Transient for ReportError {
    fn is_transient(&self) -> bool {
        matches!(self, ReportError::Io { .. })
    }
}
