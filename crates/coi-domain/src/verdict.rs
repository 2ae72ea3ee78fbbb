//! Verdict module - per-rule outcomes and the aggregate result of a run

use crate::document::DocumentId;
use crate::field::FieldValue;
use crate::hashing;
use crate::rule::{Outcome, RuleId, Severity};
use crate::run::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a rule looked at when it produced its outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Examined fields; `None` marks an absent field
    pub values: BTreeMap<String, Option<FieldValue>>,
    /// Free-form explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Coercion or execution error, when the rule could not be evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Evidence {
    /// Empty evidence
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an examined field
    pub fn with_value(mut self, name: impl Into<String>, value: Option<FieldValue>) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach an error
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Outcome of one rule for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Rule that produced this verdict
    pub rule_id: RuleId,
    /// Pass, fail or inapplicable
    pub outcome: Outcome,
    /// Severity copied from the rule
    pub severity: Severity,
    /// Examined values
    pub evidence: Evidence,
    /// When the verdict was produced
    pub evaluated_at: DateTime<Utc>,
}

impl Verdict {
    /// Blocking verdict that did not pass
    pub fn is_blocking_failure(&self) -> bool {
        self.severity == Severity::Blocking && self.outcome == Outcome::Fail
    }

    /// Advisory verdict that did not pass
    pub fn is_advisory_failure(&self) -> bool {
        self.severity == Severity::Advisory && self.outcome == Outcome::Fail
    }
}

/// Overall compliance of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    /// Every blocking rule passed
    Compliant,
    /// At least one blocking rule failed
    NonCompliant,
    /// No blocking failure, but a blocking rule could not be evaluated
    Indeterminate,
}

impl AggregateStatus {
    /// Derive the aggregate from a set of verdicts
    ///
    /// Advisory verdicts never change the aggregate.
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::AggregateStatus;
    ///
    /// assert_eq!(AggregateStatus::from_verdicts(&[]), AggregateStatus::Compliant);
    /// ```
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let blocking = verdicts.iter().filter(|v| v.severity == Severity::Blocking);
        let mut status = AggregateStatus::Compliant;
        for verdict in blocking {
            match verdict.outcome {
                Outcome::Fail => return AggregateStatus::NonCompliant,
                Outcome::Inapplicable => status = AggregateStatus::Indeterminate,
                Outcome::Pass => {}
            }
        }
        status
    }

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateStatus::Compliant => "compliant",
            AggregateStatus::NonCompliant => "non_compliant",
            AggregateStatus::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All verdicts of one run plus the aggregate status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// Run that produced the result
    pub run_id: RunId,
    /// Evaluated document
    pub document_id: DocumentId,
    /// Aggregate status derived from the verdicts
    pub status: AggregateStatus,
    /// Verdicts ordered by rule id
    pub verdicts: Vec<Verdict>,
}

impl ComplianceResult {
    /// Build a result, ordering verdicts by rule id and deriving the status
    pub fn new(run_id: RunId, document_id: DocumentId, mut verdicts: Vec<Verdict>) -> Self {
        verdicts.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        let status = AggregateStatus::from_verdicts(&verdicts);
        Self {
            run_id,
            document_id,
            status,
            verdicts,
        }
    }

    /// Blocking verdicts that failed
    pub fn blocking_failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_blocking_failure())
    }

    /// Advisory verdicts that failed
    pub fn advisory_failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_advisory_failure())
    }

    /// Look up the verdict of a rule
    pub fn verdict(&self, rule_id: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.rule_id.as_str() == rule_id)
    }

    /// blake3 digest of the canonical JSON form of this result
    ///
    /// Equal results always share a fingerprint, which makes reruns easy to
    /// diff.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        hashing::fingerprint(self)
    }
}
