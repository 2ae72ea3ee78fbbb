//! Evaluation context - the explicit inputs a rule may read besides fields

use crate::field::Money;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inputs to rule evaluation other than the FieldMap
///
/// Rules never read the wall clock: "today" is `reference_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Date against which expiry is judged
    pub reference_date: NaiveDate,

    /// End of the contract the certificate must cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_end_date: Option<NaiveDate>,

    /// Minimum limit per coverage type
    #[serde(default)]
    pub required_minimums: BTreeMap<String, Money>,

    /// Parties or endorsements the certificate must name
    #[serde(default)]
    pub required_endorsements: Vec<String>,

    /// Explicit timestamp stamped on every verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl EvaluationContext {
    /// Context with only a reference date
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            contract_end_date: None,
            required_minimums: BTreeMap::new(),
            required_endorsements: Vec::new(),
            evaluated_at: None,
        }
    }

    /// Set the contract end date
    pub fn with_contract_end_date(mut self, date: NaiveDate) -> Self {
        self.contract_end_date = Some(date);
        self
    }

    /// Require a minimum limit for a coverage type
    pub fn with_minimum(mut self, coverage_type: impl Into<String>, amount: Money) -> Self {
        self.required_minimums.insert(coverage_type.into(), amount);
        self
    }

    /// Require an endorsement or additional insured
    pub fn with_endorsement(mut self, endorsement: impl Into<String>) -> Self {
        self.required_endorsements.push(endorsement.into());
        self
    }

    /// Pin the verdict timestamp
    pub fn with_evaluated_at(mut self, at: DateTime<Utc>) -> Self {
        self.evaluated_at = Some(at);
        self
    }

    /// Timestamp for verdicts: `evaluated_at`, else midnight UTC of the reference date
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::EvaluationContext;
    /// use chrono::NaiveDate;
    ///
    /// let ctx = EvaluationContext::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    /// assert_eq!(ctx.verdict_timestamp().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    /// ```
    pub fn verdict_timestamp(&self) -> DateTime<Utc> {
        self.evaluated_at
            .unwrap_or_else(|| self.reference_date.and_time(NaiveTime::MIN).and_utc())
    }

    /// Validate the context
    pub fn validate(&self) -> Result<(), String> {
        for (coverage_type, amount) in &self.required_minimums {
            if coverage_type.trim().is_empty() {
                return Err("required_minimums contains an empty coverage type".to_string());
            }
            if amount.is_negative() {
                return Err(format!(
                    "required minimum for {} must not be negative",
                    coverage_type
                ));
            }
        }

        if self.required_endorsements.iter().any(|e| e.trim().is_empty()) {
            return Err("required_endorsements contains an empty entry".to_string());
        }

        Ok(())
    }
}
