//! Error types for the field extractors

use coi_domain::traits::Transient;
use coi_llm::LlmError;
use thiserror::Error;

/// Errors that can occur during field extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Text exceeds maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// The model answered with something other than a field object
    #[error("Invalid field format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// A built-in pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

impl Transient for ExtractorError {
    fn is_transient(&self) -> bool {
        match self {
            ExtractorError::Llm(e) => e.is_transient(),
            _ => false,
        }
    }
}
