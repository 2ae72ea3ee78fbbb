//! COI Compliance Rule Engine
//!
//! Loads declarative rule sets and evaluates them against extracted fields.
//!
//! The engine provides:
//! - Rule loading from JSON or TOML with load-time validation
//! - Total predicate evaluation (date checks, thresholds, membership, presence)
//! - Per-rule failure containment
//! - The standard compliance policy as configurable presets
//!
//! # Examples
//!
//! ```
//! use coi_domain::{DocumentId, FieldMap, FieldValue, RunId, AggregateStatus};
//! use coi_rules::{ComplianceEvaluator, CompliancePolicy};
//! use chrono::NaiveDate;
//!
//! let policy = CompliancePolicy::default();
//! let rules = policy.to_ruleset().unwrap();
//! let ctx = policy.context(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
//!
//! let fields = FieldMap::new().with("expiration_date", FieldValue::text("2023-01-01"));
//! let result = ComplianceEvaluator::new()
//!     .evaluate(RunId::new(), DocumentId::new("acme.txt"), &fields, &rules, &ctx)
//!     .unwrap();
//! assert_eq!(result.status, AggregateStatus::NonCompliant);
//! ```

#![warn(missing_docs)]

mod error;
mod evaluator;
mod policy;
mod predicate;
mod ruleset;

pub use error::{EvaluationError, RuleDefinitionError, RuleExecutionError};
pub use evaluator::ComplianceEvaluator;
pub use policy::CompliancePolicy;
pub use ruleset::{RuleSet, RuleSource};
