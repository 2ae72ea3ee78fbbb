//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] coi_pipeline::PipelineError),

    /// Run log error
    #[error("Run log error: {0}")]
    Store(#[from] coi_store::StoreError),

    /// Rule file error
    #[error("Rule error: {0}")]
    Rules(#[from] coi_rules::RuleDefinitionError),

    /// Extractor setup error
    #[error("Extractor error: {0}")]
    Extractor(#[from] coi_extractor::ExtractorError),

    /// Language model setup error
    #[error("LLM error: {0}")]
    Llm(#[from] coi_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// One or more runs did not succeed
    #[error("{0} run(s) failed")]
    RunsFailed(usize),
}
