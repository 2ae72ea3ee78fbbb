//! Rule engine error types

use coi_domain::FieldType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a RuleSet
///
/// Always fatal: a run never starts with a rule set that failed to load.
#[derive(Error, Debug)]
pub enum RuleDefinitionError {
    /// Two rules share an id
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),

    /// A rule is structurally invalid
    #[error("Malformed rule '{rule}': {reason}")]
    Malformed {
        /// Rule id, or its position when the id is unreadable
        rule: String,
        /// What is wrong
        reason: String,
    },

    /// A rule names a field type that does not exist
    #[error("Rule '{rule}' references unknown field type '{field_type}'")]
    UnknownFieldType {
        /// Rule id
        rule: String,
        /// The unknown type name
        field_type: String,
    },

    /// A predicate cannot read the declared field type
    #[error("Rule '{rule}': a {kind} predicate cannot read {field_type} fields")]
    IncompatibleFieldType {
        /// Rule id
        rule: String,
        /// Predicate kind
        kind: String,
        /// Declared field type
        field_type: FieldType,
    },

    /// The rule document is not valid JSON or TOML
    #[error("Parse error: {0}")]
    Parse(String),

    /// The rule file could not be read
    #[error("Failed to read rules from {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while evaluating one rule
///
/// Never propagated: the rule set records it as a failed verdict and keeps
/// evaluating the remaining rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleExecutionError {
    /// The predicate needs a context value that is not set
    #[error("Rule '{rule}' needs context value '{key}', which is not set")]
    MissingContext {
        /// Rule id
        rule: String,
        /// Missing context key
        key: String,
    },

    /// Date arithmetic left the representable range
    #[error("Rule '{rule}': date offset of {offset_days} days is out of range")]
    DateOutOfRange {
        /// Rule id
        rule: String,
        /// Offending offset
        offset_days: i64,
    },

    /// The predicate panicked
    #[error("Rule '{rule}' panicked: {message}")]
    Panicked {
        /// Rule id
        rule: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

/// Errors that stop an evaluation before any rule runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The evaluation context failed validation
    #[error("Invalid evaluation context: {0}")]
    InvalidContext(String),
}
