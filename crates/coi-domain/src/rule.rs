//! Rule module - declarative compliance rules
//!
//! A rule never carries executable code. Its predicate is one of a closed set
//! of tagged variants, interpreted by the evaluator in `coi-rules`.

use crate::field::{FieldType, Money};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a rule within a RuleSet
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Create a rule id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How much a failing rule matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Failure makes the document non-compliant
    Blocking,
    /// Failure is reported but does not change the aggregate status
    Advisory,
}

impl Severity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blocking => "blocking",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The predicate holds
    Pass,
    /// The predicate does not hold, or could not be evaluated
    Fail,
    /// The target field is absent
    Inapplicable,
}

impl Outcome {
    /// Get the outcome name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Inapplicable => "inapplicable",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a comparison accepts equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Equality passes
    Inclusive,
    /// Equality fails
    Exclusive,
}

impl Boundary {
    /// `value >= limit` (inclusive) or `value > limit` (exclusive)
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::Boundary;
    ///
    /// assert!(Boundary::Inclusive.at_least(&5, &5));
    /// assert!(!Boundary::Exclusive.at_least(&5, &5));
    /// ```
    pub fn at_least<T: PartialOrd>(&self, value: &T, limit: &T) -> bool {
        match self {
            Boundary::Inclusive => value >= limit,
            Boundary::Exclusive => value > limit,
        }
    }

    /// `value <= limit` (inclusive) or `value < limit` (exclusive)
    pub fn at_most<T: PartialOrd>(&self, value: &T, limit: &T) -> bool {
        match self {
            Boundary::Inclusive => value <= limit,
            Boundary::Exclusive => value < limit,
        }
    }
}

/// Direction of a date comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateDirection {
    /// The field date must be on or after the reference
    NotBefore,
    /// The field date must be on or before the reference
    NotAfter,
}

/// Date a date check compares against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateReference {
    /// `EvaluationContext::reference_date`
    ReferenceDate,
    /// `EvaluationContext::contract_end_date` (must be set in the context)
    ContractEndDate,
    /// A fixed calendar date
    Fixed(NaiveDate),
}

/// Minimum a threshold compares against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Minimum {
    /// A fixed amount, for money fields
    Amount(Money),
    /// A fixed count, for integer fields
    Count(i64),
    /// Look the amount up in `EvaluationContext::required_minimums`
    CoverageType(String),
}

/// Values a membership check requires
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredSet {
    /// A fixed list
    Values(Vec<String>),
    /// `EvaluationContext::required_endorsements`
    ContextEndorsements,
}

/// How a required value is matched against list items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Item equals the required value
    Exact,
    /// Item contains the required value, ignoring case
    ContainsIgnoreCase,
}

impl MatchMode {
    /// Whether `item` satisfies `required` under this mode
    pub fn matches(&self, item: &str, required: &str) -> bool {
        match self {
            MatchMode::Exact => item == required,
            MatchMode::ContainsIgnoreCase => {
                item.to_lowercase().contains(&required.to_lowercase())
            }
        }
    }
}

/// Predicate of a rule, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Compare a date field against a reference date plus an offset
    DateCheck {
        /// Target field
        field: String,
        /// Comparison direction
        direction: DateDirection,
        /// Reference date
        reference: DateReference,
        /// Days added to the reference before comparing
        #[serde(default)]
        offset_days: i64,
        /// Whether equality passes
        boundary: Boundary,
    },
    /// Compare a money or integer field against a minimum
    Threshold {
        /// Target field
        field: String,
        /// Minimum value
        minimum: Minimum,
        /// Whether equality passes
        boundary: Boundary,
    },
    /// Require every value of a set to appear in a list field
    Membership {
        /// Target field
        field: String,
        /// Required values
        required: RequiredSet,
        /// How items are matched
        match_mode: MatchMode,
    },
    /// Require fields to be present and non-empty
    Presence {
        /// Fields that must be present
        fields: Vec<String>,
    },
}

impl Predicate {
    /// Name of the predicate kind, as it appears in rule files
    pub fn kind_name(&self) -> &'static str {
        match self {
            Predicate::DateCheck { .. } => "date_check",
            Predicate::Threshold { .. } => "threshold",
            Predicate::Membership { .. } => "membership",
            Predicate::Presence { .. } => "presence",
        }
    }

    /// Field names this predicate reads
    pub fn target_fields(&self) -> Vec<&str> {
        match self {
            Predicate::DateCheck { field, .. }
            | Predicate::Threshold { field, .. }
            | Predicate::Membership { field, .. } => vec![field.as_str()],
            Predicate::Presence { fields } => fields.iter().map(String::as_str).collect(),
        }
    }

    /// Whether a rule of this kind can read a field of the given type
    pub fn accepts(&self, field_type: FieldType) -> bool {
        match self {
            Predicate::DateCheck { .. } => field_type == FieldType::Date,
            Predicate::Threshold { minimum, .. } => match minimum {
                Minimum::Count(_) => field_type == FieldType::Integer,
                Minimum::Amount(_) | Minimum::CoverageType(_) => field_type == FieldType::Money,
            },
            Predicate::Membership { .. } => field_type == FieldType::List,
            Predicate::Presence { .. } => true,
        }
    }
}

/// A compliance rule
///
/// Immutable once loaded. Rules are order-independent: evaluating a set in
/// any order produces the same verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Unique id
    pub id: RuleId,
    /// Human-readable description
    pub description: String,
    /// Blocking or advisory
    pub severity: Severity,
    /// Declared type of the target field(s)
    pub field_type: FieldType,
    /// What the rule checks
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl Rule {
    /// Create a rule
    pub fn new(
        id: impl Into<RuleId>,
        description: impl Into<String>,
        severity: Severity,
        field_type: FieldType,
        predicate: Predicate,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
            field_type,
            predicate,
        }
    }

    /// Whether a failure of this rule blocks compliance
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}
