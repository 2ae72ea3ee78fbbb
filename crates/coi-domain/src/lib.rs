//! COI Compliance Domain Layer
//!
//! This crate contains the value types and trait boundaries shared by every
//! other crate of the workspace. It performs no I/O: documents, field maps,
//! rules, verdicts and pipeline runs are plain immutable values, and every
//! external collaborator (document storage, field extraction, language
//! models, report storage, run logs) is reached through a trait defined in
//! [`traits`].
//!
//! ## Key Concepts
//!
//! - **Document**: raw text of a Certificate of Insurance plus its source
//! - **FieldMap**: typed fields extracted from a document; absence is meaningful
//! - **Rule**: a declarative predicate over a FieldMap with a severity
//! - **Verdict**: the outcome of one rule for one run
//! - **ComplianceResult**: all verdicts of a run plus the aggregate status
//! - **PipelineRun**: the replayed view of an append-only run event log
//!
//! ## Architecture
//!
//! - Pure data and pure functions only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod document;
pub mod field;
pub mod hashing;
pub mod rule;
pub mod run;
pub mod traits;
pub mod verdict;

// Re-exports for convenience
pub use context::EvaluationContext;
pub use document::{Document, DocumentId, DocumentMetadata};
pub use field::{names, CoercionError, FieldMap, FieldType, FieldValue, Money};
pub use rule::{
    Boundary, DateDirection, DateReference, MatchMode, Minimum, Outcome, Predicate, RequiredSet,
    Rule, RuleId, Severity,
};
pub use run::{
    Artifact, PipelineRun, ReportFormat, ReportRef, RunArtifacts, RunEvent, RunEventKind, RunId,
    RunRecord, RunStatus, StepName, StepRecord, StepStatus,
};
pub use verdict::{AggregateStatus, ComplianceResult, Evidence, Verdict};
