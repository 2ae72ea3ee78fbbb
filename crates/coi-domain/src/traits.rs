//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the compliance core and
//! infrastructure. Implementations live in other crates.

use crate::field::FieldMap;
use crate::run::{ReportFormat, RunEvent, RunEventKind, RunId};
use crate::verdict::ComplianceResult;

/// Classification of errors that may succeed on a later attempt
///
/// The orchestrator retries a step only when its error is transient
/// (I/O hiccups, network failures, timeouts).
pub trait Transient {
    /// Whether retrying could help
    fn is_transient(&self) -> bool;
}

/// Trait for fetching the raw text of a document
///
/// Implemented by the infrastructure layer (coi-pipeline `FileSource`)
pub trait DocumentSource {
    /// Error type for fetch operations
    type Error: std::error::Error + Transient + Send + Sync + 'static;

    /// Fetch the OCR'd text of a document
    fn fetch(&self, source: &str) -> Result<String, Self::Error>;
}

/// Trait for turning raw text into fields
///
/// Implemented by the application layer (coi-extractor). May return a
/// partial or empty map; must never invent fields it did not find.
pub trait FieldExtractor {
    /// Error type for extraction operations
    type Error: std::error::Error + Transient + Send + Sync + 'static;

    /// Extract fields from raw document text
    fn extract(&self, text: &str) -> Result<FieldMap, Self::Error>;
}

/// Trait for narrative summaries of a compliance result
///
/// Implemented by coi-llm. Failures never fail a run.
pub trait Summarizer {
    /// Error type for summarization
    type Error: std::error::Error + Transient + Send + Sync + 'static;

    /// Summarize a document and its compliance result
    fn summarize(&self, text: &str, result: &ComplianceResult) -> Result<String, Self::Error>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (coi-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}

/// Trait for persisting built reports
///
/// Implemented by coi-report (`DirectorySink`)
pub trait ReportSink {
    /// Error type for storage operations
    type Error: std::error::Error + Transient + Send + Sync + 'static;

    /// Store a report body and return where it was written
    fn store(&self, run_id: RunId, format: ReportFormat, body: &str) -> Result<String, Self::Error>;
}

/// Append-only log of run events
///
/// Implemented by coi-pipeline (in memory) and coi-store (SQLite). Takes
/// `&self` so concurrent runs can share one log; sequence numbers are
/// assigned per run.
pub trait RunLogStore {
    /// Error type for log operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append an event and return it with its sequence number and timestamp
    fn append(&self, run_id: RunId, kind: RunEventKind) -> Result<RunEvent, Self::Error>;

    /// Append the first event of a run
    ///
    /// Returns `None`, appending nothing, when the run already has events.
    /// The check and the append happen atomically, so of several callers
    /// starting the same run exactly one gets `Some`.
    fn start(&self, run_id: RunId, kind: RunEventKind) -> Result<Option<RunEvent>, Self::Error>;

    /// All events of a run, in sequence order; empty for unknown runs
    fn events(&self, run_id: RunId) -> Result<Vec<RunEvent>, Self::Error>;

    /// Ids of every logged run, oldest first
    fn run_ids(&self) -> Result<Vec<RunId>, Self::Error>;
}
