//! COI Compliance Reports
//!
//! Turns a [`ComplianceResult`](coi_domain::ComplianceResult) plus its
//! document's metadata into a JSON or CSV report, and stores reports
//! through the domain `ReportSink` boundary.
//!
//! # Formats
//!
//! - JSON: one document with run id, document id, source metadata,
//!   aggregate status, optional summary and the verdicts
//! - CSV: one row per verdict, evidence flattened to `name=value` pairs
//!
//! Verdicts are always ordered by rule id.

#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod error;
pub mod sink;

pub use builder::{Report, ReportBuilder, LIST_SEPARATOR, SEE_JSON};
pub use config::{NonScalarPolicy, ReportConfig};
pub use error::ReportError;
pub use sink::DirectorySink;
