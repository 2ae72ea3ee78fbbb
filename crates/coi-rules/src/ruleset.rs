//! RuleSet loading and evaluation

use crate::predicate::{examined, judge};
use crate::{RuleDefinitionError, RuleExecutionError};
use coi_domain::{
    EvaluationContext, FieldMap, FieldType, Minimum, Outcome, Predicate, RequiredSet, Rule,
    RuleId, Severity, Verdict,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a rule set comes from
#[derive(Debug, Clone)]
pub enum RuleSource {
    /// JSON text: an array of rules or an object with a `rules` array
    Json(String),
    /// TOML text with `[[rules]]` tables
    Toml(String),
    /// A `.json` or `.toml` file
    File(PathBuf),
}

/// Rule as written in a rule file, before its field type is resolved
#[derive(Debug, Deserialize)]
struct RuleDefinition {
    id: String,
    #[serde(default)]
    description: String,
    severity: Severity,
    field_type: String,
    #[serde(flatten)]
    predicate: Predicate,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonRules {
    List(Vec<serde_json::Value>),
    File(RuleFile),
}

/// A validated, immutable collection of rules
///
/// Rules are kept ordered by id, so evaluation order (and verdict order) is
/// independent of the order they were written in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Load and validate a rule set
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_rules::{RuleSet, RuleSource};
    ///
    /// let rules = RuleSet::load(RuleSource::Json(r#"[{
    ///     "id": "not-expired",
    ///     "severity": "blocking",
    ///     "field_type": "date",
    ///     "kind": "date_check",
    ///     "field": "expiration_date",
    ///     "direction": "not_before",
    ///     "reference": "reference_date",
    ///     "boundary": "inclusive"
    /// }]"#.to_string())).unwrap();
    /// assert_eq!(rules.len(), 1);
    /// ```
    pub fn load(source: RuleSource) -> Result<Self, RuleDefinitionError> {
        let raw = match source {
            RuleSource::Json(text) => parse_json(&text)?,
            RuleSource::Toml(text) => parse_toml(&text)?,
            RuleSource::File(path) => return Self::load_file(&path),
        };

        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, value)| resolve(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_rules(rules)
    }

    fn load_file(path: &Path) -> Result<Self, RuleDefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| RuleDefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        let source = match extension.as_deref() {
            Some("toml") => RuleSource::Toml(text),
            Some("json") => RuleSource::Json(text),
            other => {
                return Err(RuleDefinitionError::Parse(format!(
                    "cannot tell the format of {} from its extension {:?}",
                    path.display(),
                    other.unwrap_or("")
                )))
            }
        };

        let rules = Self::load(source)?;
        debug!("Loaded {} rules from {}", rules.len(), path.display());
        Ok(rules)
    }

    /// Build a rule set from already-typed rules, applying the same checks as [`RuleSet::load`]
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, RuleDefinitionError> {
        let mut seen = BTreeSet::new();
        for rule in &rules {
            validate(rule)?;
            if !seen.insert(rule.id.clone()) {
                return Err(RuleDefinitionError::DuplicateRuleId(rule.id.to_string()));
            }
        }

        let mut rules = rules;
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { rules })
    }

    /// Evaluate every rule, one verdict per rule, ordered by rule id
    ///
    /// A rule that errors or panics yields a `fail` verdict carrying the
    /// error; the other rules still run. The context is assumed valid.
    pub fn evaluate_all(&self, fields: &FieldMap, ctx: &EvaluationContext) -> Vec<Verdict> {
        let evaluated_at = ctx.verdict_timestamp();

        self.rules
            .iter()
            .map(|rule| {
                let judged = catch_unwind(AssertUnwindSafe(|| judge(rule, fields, ctx)))
                    .unwrap_or_else(|payload| {
                        Err(RuleExecutionError::Panicked {
                            rule: rule.id.to_string(),
                            message: panic_message(payload.as_ref()),
                        })
                    });

                let (outcome, evidence) = match judged {
                    Ok(judgement) => judgement,
                    Err(err) => {
                        warn!("Rule {} could not be evaluated: {}", rule.id, err);
                        (Outcome::Fail, examined(rule, fields).with_error(err.to_string()))
                    }
                };

                Verdict {
                    rule_id: rule.id.clone(),
                    outcome,
                    severity: rule.severity,
                    evidence,
                    evaluated_at,
                }
            })
            .collect()
    }

    /// Look up a rule by id
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id.as_str() == id)
    }

    /// Iterate over rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ids of every rule, in order
    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id.clone()).collect()
    }
}

fn parse_json(text: &str) -> Result<Vec<serde_json::Value>, RuleDefinitionError> {
    let parsed: JsonRules =
        serde_json::from_str(text).map_err(|e| RuleDefinitionError::Parse(e.to_string()))?;
    Ok(match parsed {
        JsonRules::List(rules) => rules,
        JsonRules::File(file) => file.rules,
    })
}

fn parse_toml(text: &str) -> Result<Vec<serde_json::Value>, RuleDefinitionError> {
    let file: RuleFile =
        toml::from_str(text).map_err(|e| RuleDefinitionError::Parse(e.to_string()))?;
    Ok(file.rules)
}

/// Turn one raw rule into a typed rule, attributing errors to its id
fn resolve(index: usize, value: serde_json::Value) -> Result<Rule, RuleDefinitionError> {
    let label = value
        .get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index + 1));

    let def: RuleDefinition =
        serde_json::from_value(value).map_err(|e| RuleDefinitionError::Malformed {
            rule: label.clone(),
            reason: e.to_string(),
        })?;

    let field_type =
        FieldType::parse(&def.field_type).ok_or_else(|| RuleDefinitionError::UnknownFieldType {
            rule: label,
            field_type: def.field_type.clone(),
        })?;

    Ok(Rule::new(
        def.id,
        def.description,
        def.severity,
        field_type,
        def.predicate,
    ))
}

/// Structural checks shared by every way of building a rule set
fn validate(rule: &Rule) -> Result<(), RuleDefinitionError> {
    let malformed = |reason: &str| RuleDefinitionError::Malformed {
        rule: rule.id.to_string(),
        reason: reason.to_string(),
    };

    if rule.id.as_str().trim().is_empty() {
        return Err(malformed("rule id must not be empty"));
    }

    let targets = rule.predicate.target_fields();
    if targets.is_empty() {
        return Err(malformed("predicate names no fields"));
    }
    if targets.iter().any(|f| f.trim().is_empty()) {
        return Err(malformed("field names must not be empty"));
    }

    match &rule.predicate {
        Predicate::Threshold { minimum, .. } => match minimum {
            Minimum::Amount(amount) if amount.is_negative() => {
                return Err(malformed("threshold minimum must not be negative"))
            }
            Minimum::Count(count) if *count < 0 => {
                return Err(malformed("threshold minimum must not be negative"))
            }
            Minimum::CoverageType(key) if key.trim().is_empty() => {
                return Err(malformed("coverage type must not be empty"))
            }
            _ => {}
        },
        Predicate::Membership {
            required: RequiredSet::Values(values),
            ..
        } => {
            if values.is_empty() {
                return Err(malformed("required set must not be empty"));
            }
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(malformed("required values must not be empty"));
            }
        }
        _ => {}
    }

    if !rule.predicate.accepts(rule.field_type) {
        return Err(RuleDefinitionError::IncompatibleFieldType {
            rule: rule.id.to_string(),
            kind: rule.predicate.kind_name().to_string(),
            field_type: rule.field_type,
        });
    }

    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENCE: &str = r#"{"id": "required-fields", "severity": "blocking", "field_type": "text",
        "kind": "presence", "fields": ["policy_number", "insurer"]}"#;

    fn json(rules: &[&str]) -> RuleSource {
        RuleSource::Json(format!("[{}]", rules.join(",")))
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = RuleSet::load(json(&[PRESENCE, PRESENCE])).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::DuplicateRuleId(id) if id == "required-fields"));
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let rule = r#"{"id": "x", "severity": "advisory", "field_type": "currency",
            "kind": "presence", "fields": ["a"]}"#;
        let err = RuleSet::load(json(&[rule])).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::UnknownFieldType { field_type, .. } if field_type == "currency"));
    }

    #[test]
    fn test_incompatible_field_type_rejected() {
        let rule = r#"{"id": "x", "severity": "blocking", "field_type": "text",
            "kind": "threshold", "field": "coverage_limit.auto", "minimum": {"amount": 1000},
            "boundary": "inclusive"}"#;
        let err = RuleSet::load(json(&[rule])).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::IncompatibleFieldType { .. }));
    }

    #[test]
    fn test_malformed_predicates_rejected() {
        let cases = [
            // missing boundary
            r#"{"id": "a", "severity": "blocking", "field_type": "integer", "kind": "threshold",
                "field": "cancellation_notice_days", "minimum": {"count": 30}}"#,
            // negative threshold
            r#"{"id": "b", "severity": "blocking", "field_type": "integer", "kind": "threshold",
                "field": "cancellation_notice_days", "minimum": {"count": -1}, "boundary": "inclusive"}"#,
            // empty required set
            r#"{"id": "c", "severity": "blocking", "field_type": "list", "kind": "membership",
                "field": "endorsements", "required": {"values": []}, "match_mode": "exact"}"#,
            // empty field name
            r#"{"id": "d", "severity": "blocking", "field_type": "text", "kind": "presence",
                "fields": [""]}"#,
            // unknown predicate kind
            r#"{"id": "e", "severity": "blocking", "field_type": "text", "kind": "regex",
                "field": "insurer"}"#,
        ];
        for case in cases {
            let err = RuleSet::load(json(&[case])).unwrap_err();
            assert!(
                matches!(err, RuleDefinitionError::Malformed { .. }),
                "expected malformed for {}, got {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_malformed_rule_without_id_is_labelled_by_position() {
        let err = RuleSet::load(json(&[PRESENCE, r#"{"severity": "blocking"}"#])).unwrap_err();
        assert!(matches!(err, RuleDefinitionError::Malformed { rule, .. } if rule == "#2"));
    }

    #[test]
    fn test_json_object_form_and_toml() {
        let object = RuleSet::load(RuleSource::Json(format!(r#"{{"rules": [{}]}}"#, PRESENCE))).unwrap();

        let toml = RuleSet::load(RuleSource::Toml(
            r#"
            [[rules]]
            id = "required-fields"
            severity = "blocking"
            field_type = "text"
            kind = "presence"
            fields = ["policy_number", "insurer"]
            "#
            .to_string(),
        ))
        .unwrap();

        assert_eq!(object, toml);
    }

    #[test]
    fn test_rules_sorted_by_id() {
        let b = PRESENCE.replace("required-fields", "b-rule");
        let a = PRESENCE.replace("required-fields", "a-rule");
        let rules = RuleSet::load(json(&[&b, &a])).unwrap();
        let ids: Vec<String> = rules.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a-rule", "b-rule"]);
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("rules.json");
        std::fs::write(&json_path, format!("[{}]", PRESENCE)).unwrap();
        assert_eq!(RuleSet::load(RuleSource::File(json_path)).unwrap().len(), 1);

        let yaml_path = dir.path().join("rules.yaml");
        std::fs::write(&yaml_path, "rules: []").unwrap();
        assert!(matches!(
            RuleSet::load(RuleSource::File(yaml_path)),
            Err(RuleDefinitionError::Parse(_))
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RuleSet::load(RuleSource::File(missing)),
            Err(RuleDefinitionError::Io { .. })
        ));
    }
}
