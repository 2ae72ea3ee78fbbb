//! Standard compliance policy
//!
//! Generates the built-in checks every COI goes through: required fields,
//! minimum coverage per type, expiry, an expiry warning window, required
//! additional insureds and a minimum cancellation notice.

use crate::{RuleDefinitionError, RuleSet};
use chrono::NaiveDate;
use coi_domain::{
    names, Boundary, DateDirection, DateReference, EvaluationContext, FieldType, MatchMode,
    Minimum, Money, Predicate, RequiredSet, Rule, Severity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration of the standard compliance checks
///
/// # Examples
///
/// ```
/// use coi_rules::CompliancePolicy;
///
/// let policy = CompliancePolicy::default();
/// assert_eq!(policy.expiration_warning_days, 30);
///
/// let strict = CompliancePolicy::strict();
/// assert!(strict.notice_days_blocking);
///
/// let permissive = CompliancePolicy::permissive();
/// assert_eq!(permissive.minimum_coverage.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompliancePolicy {
    /// Fields that must be present and non-empty
    pub required_fields: Vec<String>,

    /// Days before expiry at which an advisory warning is raised
    /// Default: 30
    pub expiration_warning_days: i64,

    /// Parties that must be named as additional insureds (substring match, case-insensitive)
    /// Default: none
    #[serde(default)]
    pub required_additional_insureds: Vec<String>,

    /// Minimum written notice before cancellation, in days
    /// Default: 30
    pub required_cancellation_notice_days: i64,

    /// Whether a short cancellation notice blocks compliance
    /// Default: false (advisory)
    #[serde(default)]
    pub notice_days_blocking: bool,

    /// Whether coverage must run through the contract end date
    /// Default: false; needs `contract_end_date` in the evaluation context
    #[serde(default)]
    pub require_coverage_through_contract_end: bool,

    /// Minimum limit per coverage type
    pub minimum_coverage: BTreeMap<String, Money>,
}

impl Default for CompliancePolicy {
    /// Balanced checks
    ///
    /// - Required: policy number, insurer, insured name, effective and expiration dates
    /// - $1,000,000 general liability, professional liability, workers compensation
    /// - 30 day expiry warning, 30 day cancellation notice (advisory)
    fn default() -> Self {
        Self {
            required_fields: vec![
                names::POLICY_NUMBER.to_string(),
                names::INSURER.to_string(),
                names::INSURED_NAME.to_string(),
                names::EFFECTIVE_DATE.to_string(),
                names::EXPIRATION_DATE.to_string(),
            ],
            expiration_warning_days: 30,
            required_additional_insureds: Vec::new(),
            required_cancellation_notice_days: 30,
            notice_days_blocking: false,
            require_coverage_through_contract_end: false,
            minimum_coverage: [
                "general_liability",
                "professional_liability",
                "workers_compensation",
            ]
            .into_iter()
            .map(|t| (t.to_string(), Money::from_dollars(1_000_000)))
            .collect(),
        }
    }
}

impl CompliancePolicy {
    /// Strict preset: certificate holder required, 60 day warning, blocking notice check
    pub fn strict() -> Self {
        let mut required_fields = Self::default().required_fields;
        required_fields.push(names::CERTIFICATE_HOLDER.to_string());

        Self {
            required_fields,
            expiration_warning_days: 60,
            notice_days_blocking: true,
            ..Self::default()
        }
    }

    /// Permissive preset: general liability only, short warning and notice windows
    pub fn permissive() -> Self {
        Self {
            required_fields: vec![
                names::POLICY_NUMBER.to_string(),
                names::INSURED_NAME.to_string(),
                names::EXPIRATION_DATE.to_string(),
            ],
            expiration_warning_days: 15,
            required_additional_insureds: Vec::new(),
            required_cancellation_notice_days: 10,
            notice_days_blocking: false,
            require_coverage_through_contract_end: false,
            minimum_coverage: BTreeMap::from([(
                "general_liability".to_string(),
                Money::from_dollars(1_000_000),
            )]),
        }
    }

    /// Look a preset up by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "strict" => Some(Self::strict()),
            "permissive" => Some(Self::permissive()),
            _ => None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.required_fields.iter().any(|f| f.trim().is_empty()) {
            return Err("required_fields must not contain empty names".to_string());
        }
        if self.expiration_warning_days < 0 {
            return Err("expiration_warning_days must not be negative".to_string());
        }
        if self.required_cancellation_notice_days < 0 {
            return Err("required_cancellation_notice_days must not be negative".to_string());
        }
        if let Some((coverage, _)) = self.minimum_coverage.iter().find(|(_, m)| m.is_negative()) {
            return Err(format!("minimum coverage for {} must not be negative", coverage));
        }
        Ok(())
    }

    /// Generate the rule set for this policy
    ///
    /// Coverage thresholds read their minimum from the context, so the
    /// context built by [`CompliancePolicy::context`] must accompany it.
    pub fn to_ruleset(&self) -> Result<RuleSet, RuleDefinitionError> {
        let mut rules = Vec::new();

        if !self.required_fields.is_empty() {
            rules.push(Rule::new(
                "required-fields",
                "All required certificate fields are present",
                Severity::Blocking,
                FieldType::Text,
                Predicate::Presence {
                    fields: self.required_fields.clone(),
                },
            ));
        }

        for coverage_type in self.minimum_coverage.keys() {
            rules.push(Rule::new(
                format!("minimum-coverage.{}", coverage_type),
                format!("{} limit meets the required minimum", coverage_type.replace('_', " ")),
                Severity::Blocking,
                FieldType::Money,
                Predicate::Threshold {
                    field: names::coverage_limit(coverage_type),
                    minimum: Minimum::CoverageType(coverage_type.clone()),
                    boundary: Boundary::Inclusive,
                },
            ));
        }

        rules.push(Rule::new(
            "policy-not-expired",
            "Policy has not expired at the reference date",
            Severity::Blocking,
            FieldType::Date,
            Predicate::DateCheck {
                field: names::EXPIRATION_DATE.to_string(),
                direction: DateDirection::NotBefore,
                reference: DateReference::ReferenceDate,
                offset_days: 0,
                boundary: Boundary::Inclusive,
            },
        ));

        rules.push(Rule::new(
            "expiration-warning",
            format!("Policy does not expire within {} days", self.expiration_warning_days),
            Severity::Advisory,
            FieldType::Date,
            Predicate::DateCheck {
                field: names::EXPIRATION_DATE.to_string(),
                direction: DateDirection::NotBefore,
                reference: DateReference::ReferenceDate,
                offset_days: self.expiration_warning_days,
                boundary: Boundary::Exclusive,
            },
        ));

        if !self.required_additional_insureds.is_empty() {
            rules.push(Rule::new(
                "additional-insureds",
                "Required parties are named as additional insureds",
                Severity::Blocking,
                FieldType::List,
                Predicate::Membership {
                    field: names::ADDITIONAL_INSUREDS.to_string(),
                    required: RequiredSet::ContextEndorsements,
                    match_mode: MatchMode::ContainsIgnoreCase,
                },
            ));
        }

        rules.push(Rule::new(
            "cancellation-notice",
            format!(
                "At least {} days written notice of cancellation",
                self.required_cancellation_notice_days
            ),
            if self.notice_days_blocking {
                Severity::Blocking
            } else {
                Severity::Advisory
            },
            FieldType::Integer,
            Predicate::Threshold {
                field: names::CANCELLATION_NOTICE_DAYS.to_string(),
                minimum: Minimum::Count(self.required_cancellation_notice_days),
                boundary: Boundary::Inclusive,
            },
        ));

        if self.require_coverage_through_contract_end {
            rules.push(Rule::new(
                "covers-contract-term",
                "Policy runs through the contract end date",
                Severity::Blocking,
                FieldType::Date,
                Predicate::DateCheck {
                    field: names::EXPIRATION_DATE.to_string(),
                    direction: DateDirection::NotBefore,
                    reference: DateReference::ContractEndDate,
                    offset_days: 0,
                    boundary: Boundary::Inclusive,
                },
            ));
        }

        RuleSet::from_rules(rules)
    }

    /// Evaluation context carrying this policy's minimums and required parties
    pub fn context(&self, reference_date: NaiveDate) -> EvaluationContext {
        let mut ctx = EvaluationContext::new(reference_date);
        ctx.required_minimums = self.minimum_coverage.clone();
        ctx.required_endorsements = self.required_additional_insureds.clone();
        ctx
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid_and_build() {
        for name in ["default", "strict", "permissive"] {
            let policy = CompliancePolicy::preset(name).unwrap();
            assert!(policy.validate().is_ok(), "{} preset invalid", name);
            assert!(policy.to_ruleset().is_ok(), "{} preset does not build", name);
        }
        assert!(CompliancePolicy::preset("lax").is_none());
    }

    #[test]
    fn test_default_ruleset_shape() {
        let rules = CompliancePolicy::default().to_ruleset().unwrap();
        let ids: Vec<String> = rules.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "cancellation-notice",
                "expiration-warning",
                "minimum-coverage.general_liability",
                "minimum-coverage.professional_liability",
                "minimum-coverage.workers_compensation",
                "policy-not-expired",
                "required-fields",
            ]
        );
        assert_eq!(rules.get("cancellation-notice").unwrap().severity, Severity::Advisory);
    }

    #[test]
    fn test_strict_notice_is_blocking() {
        let rules = CompliancePolicy::strict().to_ruleset().unwrap();
        assert_eq!(rules.get("cancellation-notice").unwrap().severity, Severity::Blocking);
    }

    #[test]
    fn test_additional_insureds_rule_only_when_required() {
        let mut policy = CompliancePolicy::default();
        assert!(policy.to_ruleset().unwrap().get("additional-insureds").is_none());

        policy.required_additional_insureds = vec!["Acme Holdings".to_string()];
        let rules = policy.to_ruleset().unwrap();
        assert!(rules.get("additional-insureds").is_some());

        let ctx = policy.context(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ctx.required_endorsements, vec!["Acme Holdings".to_string()]);
        assert_eq!(ctx.required_minimums.len(), 3);
    }

    #[test]
    fn test_validate_rejects_negative_windows() {
        let mut policy = CompliancePolicy::default();
        policy.expiration_warning_days = -1;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let policy = CompliancePolicy::strict();
        let toml_str = policy.to_toml().unwrap();
        let parsed = CompliancePolicy::from_toml(&toml_str).unwrap();
        assert_eq!(policy, parsed);
    }
}
