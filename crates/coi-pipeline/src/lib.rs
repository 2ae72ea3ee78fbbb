//! COI Compliance Pipeline
//!
//! Runs each certificate through Ingest → Extract → Evaluate →
//! Summarize (optional) → Report with run-level tracking.
//!
//! # Architecture
//!
//! - [`PipelineOrchestrator`]: the step state machine, retries, timeouts,
//!   resume and batch execution
//! - [`PipelineConfig`]: per-step attempts and timeouts, backoff, batch size
//! - [`CancellationToken`]: cooperative cancellation at step boundaries
//! - [`InMemoryRunLog`]: run log kept in process memory
//! - [`FileSource`]: reads certificate text from the filesystem
//!
//! Every run is an append-only sequence of events in a `RunLogStore`; the
//! run record is rebuilt by replaying them. Step failures never surface as
//! errors: they are recorded in the run, which keeps every artifact
//! produced before the failure.
//!
//! # Final status
//!
//! - `succeeded`: every mandatory step succeeded and Summarize did not fail
//! - `succeeded_with_warnings`: only Summarize failed or timed out
//! - `failed`: Ingest, Extract, Evaluate or Report failed
//! - `cancelled`: a cancellation request stopped the run

#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod source;

pub use cancel::CancellationToken;
pub use config::{BackoffConfig, PipelineConfig, StepPolicy};
pub use error::PipelineError;
pub use memory::InMemoryRunLog;
pub use orchestrator::{BatchOutcome, Collaborators, PipelineOrchestrator};
pub use source::{FileSource, SourceError, DEFAULT_MAX_BYTES};
