//! COI Compliance Field Extractors
//!
//! Adapters behind the domain `FieldExtractor` boundary that turn raw
//! certificate text into a [`FieldMap`](coi_domain::FieldMap).
//!
//! # Extractors
//!
//! - [`PatternExtractor`]: regular-expression heuristics, offline and deterministic
//! - [`LlmFieldExtractor`]: asks a language model for a JSON field object,
//!   optionally filling gaps from the pattern extractor
//! - [`ConfiguredExtractor`]: whichever of the two the configured mode selects
//!
//! Both may return partial or empty maps; an absent field is never an error.
//! Errors are classified through the domain `Transient` trait so the pipeline
//! can decide what to retry.
//!
//! # Examples
//!
//! ```
//! use coi_extractor::{ExtractorConfig, PatternExtractor};
//! use coi_domain::traits::FieldExtractor;
//!
//! let extractor = PatternExtractor::new(ExtractorConfig::default()).unwrap();
//! let fields = extractor.extract("Expiration Date: 01/01/2025").unwrap();
//! assert_eq!(fields.get("expiration_date").unwrap().to_string(), "2025-01-01");
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod llm;
pub mod normalize;
pub mod parser;
pub mod pattern;
pub mod prompt;
pub mod select;

pub use config::{ExtractionMode, ExtractorConfig};
pub use error::ExtractorError;
pub use llm::LlmFieldExtractor;
pub use pattern::PatternExtractor;
pub use select::ConfiguredExtractor;
