//! Error type shared by the providers

use coi_domain::traits::Transient;
use std::time::Duration;
use thiserror::Error;

/// Failure of a language model call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Connection dropped or the service answered 5xx
    #[error("Communication error: {0}")]
    Communication(String),

    /// The request did not complete in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The model answered with something unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP 429
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Unknown or retired model name
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Anything else the provider reports
    #[error("LLM error: {0}")]
    Other(String),
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::Timeout(_) | LlmError::RateLimitExceeded
        )
    }
}
