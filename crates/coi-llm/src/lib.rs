//! COI Compliance LLM Provider Layer
//!
//! Pluggable language model providers and the LLM-backed summarizer.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from
//! `coi-domain`, plus [`LlmSummarizer`], which implements the domain
//! `Summarizer` boundary on top of any provider.
//!
//! # Providers
//!
//! - [`GeminiProvider`]: Google Gemini `generateContent` API
//! - [`MockProvider`]: scripted answers and failures, no network
//!
//! Providers never retry internally; retry and timeout policy belongs to the
//! pipeline, which reads [`LlmError`]'s transient classification.
//!
//! # Examples
//!
//! ```
//! use coi_llm::MockProvider;
//! use coi_domain::traits::LlmProvider;
//!
//! let model = MockProvider::new(r#"{"insurer": "Travelers Property Casualty Company"}"#);
//! let answer = model.generate_structured("Extract the insurer", "{}").unwrap();
//! assert!(answer.contains("Travelers"));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod gemini;
pub mod mock;
pub mod summarizer;

pub use error::LlmError;
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use summarizer::LlmSummarizer;
