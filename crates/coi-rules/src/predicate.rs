//! Predicate interpretation
//!
//! Every predicate is total over its inputs: an absent target yields
//! `inapplicable` (presence checks yield `fail`), a value that will not
//! coerce yields `fail` with the coercion error as evidence. Only context
//! problems surface as [`RuleExecutionError`].

use crate::RuleExecutionError;
use chrono::{Duration, NaiveDate};
use coi_domain::{
    Boundary, DateDirection, DateReference, EvaluationContext, Evidence, FieldMap, Minimum,
    Outcome, Predicate, RequiredSet, Rule,
};

/// Outcome of one rule plus what it examined
pub(crate) type Judgement = (Outcome, Evidence);

/// Apply a rule's predicate to a field map
pub(crate) fn judge(
    rule: &Rule,
    fields: &FieldMap,
    ctx: &EvaluationContext,
) -> Result<Judgement, RuleExecutionError> {
    let evidence = examined(rule, fields);

    match &rule.predicate {
        Predicate::DateCheck {
            field,
            direction,
            reference,
            offset_days,
            boundary,
        } => {
            let Some(value) = fields.get(field) else {
                return Ok(absent(evidence, field));
            };
            let date = match value.as_date() {
                Ok(d) => d,
                Err(e) => return Ok((Outcome::Fail, evidence.with_error(e.to_string()))),
            };
            let reference = reference_date(rule, reference, ctx)?;
            let limit = Duration::try_days(*offset_days)
                .and_then(|offset| reference.checked_add_signed(offset))
                .ok_or_else(|| RuleExecutionError::DateOutOfRange {
                    rule: rule.id.to_string(),
                    offset_days: *offset_days,
                })?;

            let holds = match direction {
                DateDirection::NotBefore => boundary.at_least(&date, &limit),
                DateDirection::NotAfter => boundary.at_most(&date, &limit),
            };
            let note = format!(
                "{} {} must be {} {}",
                field,
                date,
                date_relation(*direction, *boundary),
                limit
            );
            Ok((outcome(holds), evidence.with_note(note)))
        }

        Predicate::Threshold {
            field,
            minimum,
            boundary,
        } => {
            let Some(value) = fields.get(field) else {
                return Ok(absent(evidence, field));
            };

            let (holds, actual, required) = match minimum {
                Minimum::Count(required) => match value.as_integer() {
                    Ok(n) => (boundary.at_least(&n, required), n.to_string(), required.to_string()),
                    Err(e) => return Ok((Outcome::Fail, evidence.with_error(e.to_string()))),
                },
                Minimum::Amount(required) => match value.as_money() {
                    Ok(m) => (boundary.at_least(&m, required), m.to_string(), required.to_string()),
                    Err(e) => return Ok((Outcome::Fail, evidence.with_error(e.to_string()))),
                },
                Minimum::CoverageType(coverage_type) => {
                    let required = ctx.required_minimums.get(coverage_type).ok_or_else(|| {
                        RuleExecutionError::MissingContext {
                            rule: rule.id.to_string(),
                            key: format!("required_minimums.{}", coverage_type),
                        }
                    })?;
                    match value.as_money() {
                        Ok(m) => (boundary.at_least(&m, required), m.to_string(), required.to_string()),
                        Err(e) => return Ok((Outcome::Fail, evidence.with_error(e.to_string()))),
                    }
                }
            };

            let comparison = match boundary {
                Boundary::Inclusive => "at least",
                Boundary::Exclusive => "more than",
            };
            let note = format!("{} is {}, required {} {}", field, actual, comparison, required);
            Ok((outcome(holds), evidence.with_note(note)))
        }

        Predicate::Membership {
            field,
            required,
            match_mode,
        } => {
            let Some(value) = fields.get(field) else {
                return Ok(absent(evidence, field));
            };
            let items = match value.as_list() {
                Ok(items) => items,
                Err(e) => return Ok((Outcome::Fail, evidence.with_error(e.to_string()))),
            };
            let required: &[String] = match required {
                RequiredSet::Values(values) => values,
                RequiredSet::ContextEndorsements => &ctx.required_endorsements,
            };

            let missing: Vec<&str> = required
                .iter()
                .filter(|req| !items.iter().any(|item| match_mode.matches(item, req)))
                .map(String::as_str)
                .collect();

            if missing.is_empty() {
                Ok((Outcome::Pass, evidence))
            } else {
                let note = format!("{} is missing: {}", field, missing.join(", "));
                Ok((Outcome::Fail, evidence.with_note(note)))
            }
        }

        Predicate::Presence { fields: targets } => {
            let mut absent_fields = Vec::new();
            let mut empty_fields = Vec::new();
            for name in targets {
                match fields.get(name) {
                    None => absent_fields.push(name.as_str()),
                    Some(value) if value.is_empty() => empty_fields.push(name.as_str()),
                    Some(_) => {}
                }
            }

            if absent_fields.is_empty() && empty_fields.is_empty() {
                return Ok((Outcome::Pass, evidence));
            }

            let mut parts = Vec::new();
            if !absent_fields.is_empty() {
                parts.push(format!("absent: {}", absent_fields.join(", ")));
            }
            if !empty_fields.is_empty() {
                parts.push(format!("empty: {}", empty_fields.join(", ")));
            }
            Ok((Outcome::Fail, evidence.with_note(parts.join("; "))))
        }
    }
}

/// Evidence pre-filled with every target field, `None` when absent
pub(crate) fn examined(rule: &Rule, fields: &FieldMap) -> Evidence {
    rule.predicate
        .target_fields()
        .into_iter()
        .fold(Evidence::new(), |evidence, name| {
            evidence.with_value(name, fields.get(name).cloned())
        })
}

fn absent(evidence: Evidence, field: &str) -> Judgement {
    (
        Outcome::Inapplicable,
        evidence.with_note(format!("{} is absent", field)),
    )
}

fn outcome(holds: bool) -> Outcome {
    if holds {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

fn reference_date(
    rule: &Rule,
    reference: &DateReference,
    ctx: &EvaluationContext,
) -> Result<NaiveDate, RuleExecutionError> {
    match reference {
        DateReference::ReferenceDate => Ok(ctx.reference_date),
        DateReference::Fixed(date) => Ok(*date),
        DateReference::ContractEndDate => {
            ctx.contract_end_date
                .ok_or_else(|| RuleExecutionError::MissingContext {
                    rule: rule.id.to_string(),
                    key: "contract_end_date".to_string(),
                })
        }
    }
}

fn date_relation(direction: DateDirection, boundary: Boundary) -> &'static str {
    match (direction, boundary) {
        (DateDirection::NotBefore, Boundary::Inclusive) => "on or after",
        (DateDirection::NotBefore, Boundary::Exclusive) => "after",
        (DateDirection::NotAfter, Boundary::Inclusive) => "on or before",
        (DateDirection::NotAfter, Boundary::Exclusive) => "before",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_domain::{names, FieldType, FieldValue, MatchMode, Money, Severity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(date(2024, 1, 1))
            .with_minimum("general_liability", Money::from_dollars(1_000_000))
            .with_endorsement("Acme Holdings")
    }

    fn rule(field_type: FieldType, predicate: Predicate) -> Rule {
        Rule::new("r", "test rule", Severity::Blocking, field_type, predicate)
    }

    fn not_expired() -> Rule {
        rule(
            FieldType::Date,
            Predicate::DateCheck {
                field: names::EXPIRATION_DATE.to_string(),
                direction: DateDirection::NotBefore,
                reference: DateReference::ReferenceDate,
                offset_days: 0,
                boundary: Boundary::Inclusive,
            },
        )
    }

    #[test]
    fn test_expired_policy_fails() {
        let fields = FieldMap::new().with(names::EXPIRATION_DATE, FieldValue::text("2023-01-01"));
        let (outcome, evidence) = judge(&not_expired(), &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);
        assert!(evidence.note.unwrap().contains("on or after 2024-01-01"));
    }

    #[test]
    fn test_date_boundary_inclusive_vs_exclusive() {
        let fields = FieldMap::new().with(names::EXPIRATION_DATE, FieldValue::Date(date(2024, 1, 31)));

        let mut warning = not_expired();
        if let Predicate::DateCheck { offset_days, boundary, .. } = &mut warning.predicate {
            *offset_days = 30;
            *boundary = Boundary::Exclusive;
        }
        let (outcome, _) = judge(&warning, &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);

        if let Predicate::DateCheck { boundary, .. } = &mut warning.predicate {
            *boundary = Boundary::Inclusive;
        }
        let (outcome, _) = judge(&warning, &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Pass);
    }

    #[test]
    fn test_unparsable_date_fails_with_error() {
        let fields = FieldMap::new().with(names::EXPIRATION_DATE, FieldValue::text("until further notice"));
        let (outcome, evidence) = judge(&not_expired(), &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);
        assert!(evidence.error.unwrap().contains("until further notice"));
    }

    #[test]
    fn test_absent_field_is_inapplicable() {
        let (outcome, evidence) = judge(&not_expired(), &FieldMap::new(), &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Inapplicable);
        assert_eq!(evidence.values.get(names::EXPIRATION_DATE), Some(&None));
    }

    #[test]
    fn test_contract_end_reference_needs_context() {
        let mut r = not_expired();
        if let Predicate::DateCheck { reference, .. } = &mut r.predicate {
            *reference = DateReference::ContractEndDate;
        }
        let fields = FieldMap::new().with(names::EXPIRATION_DATE, FieldValue::Date(date(2025, 1, 1)));
        let err = judge(&r, &fields, &ctx()).unwrap_err();
        assert!(matches!(err, RuleExecutionError::MissingContext { ref key, .. } if key == "contract_end_date"));

        let with_end = ctx().with_contract_end_date(date(2024, 12, 31));
        assert_eq!(judge(&r, &fields, &with_end).unwrap().0, Outcome::Pass);
    }

    #[test]
    fn test_threshold_against_context_minimum() {
        let r = rule(
            FieldType::Money,
            Predicate::Threshold {
                field: names::coverage_limit("general_liability"),
                minimum: Minimum::CoverageType("general_liability".to_string()),
                boundary: Boundary::Inclusive,
            },
        );
        let exact = FieldMap::new().with(names::coverage_limit("general_liability"), FieldValue::text("$1,000,000"));
        assert_eq!(judge(&r, &exact, &ctx()).unwrap().0, Outcome::Pass);

        let low = FieldMap::new().with(
            names::coverage_limit("general_liability"),
            FieldValue::Money(Money::from_dollars(500_000)),
        );
        let (outcome, evidence) = judge(&r, &low, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);
        assert_eq!(
            evidence.note.as_deref(),
            Some("coverage_limit.general_liability is $500,000, required at least $1,000,000")
        );

        let no_minimum = EvaluationContext::new(date(2024, 1, 1));
        assert!(judge(&r, &exact, &no_minimum).is_err());
    }

    #[test]
    fn test_threshold_count() {
        let r = rule(
            FieldType::Integer,
            Predicate::Threshold {
                field: names::CANCELLATION_NOTICE_DAYS.to_string(),
                minimum: Minimum::Count(30),
                boundary: Boundary::Inclusive,
            },
        );
        let ten = FieldMap::new().with(names::CANCELLATION_NOTICE_DAYS, FieldValue::text("10 days written notice"));
        assert_eq!(judge(&r, &ten, &ctx()).unwrap().0, Outcome::Fail);
        let thirty = FieldMap::new().with(names::CANCELLATION_NOTICE_DAYS, FieldValue::Integer(30));
        assert_eq!(judge(&r, &thirty, &ctx()).unwrap().0, Outcome::Pass);
    }

    #[test]
    fn test_membership_modes() {
        let mut r = rule(
            FieldType::List,
            Predicate::Membership {
                field: names::ADDITIONAL_INSUREDS.to_string(),
                required: RequiredSet::ContextEndorsements,
                match_mode: MatchMode::ContainsIgnoreCase,
            },
        );
        let fields = FieldMap::new().with(
            names::ADDITIONAL_INSUREDS,
            FieldValue::list(["ACME HOLDINGS, LLC", "Beta Corp"]),
        );
        assert_eq!(judge(&r, &fields, &ctx()).unwrap().0, Outcome::Pass);

        if let Predicate::Membership { match_mode, .. } = &mut r.predicate {
            *match_mode = MatchMode::Exact;
        }
        let (outcome, evidence) = judge(&r, &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);
        assert!(evidence.note.unwrap().contains("Acme Holdings"));
    }

    #[test]
    fn test_presence_fails_on_absent_and_empty() {
        let r = rule(
            FieldType::Text,
            Predicate::Presence {
                fields: vec![names::POLICY_NUMBER.to_string(), names::INSURER.to_string()],
            },
        );
        let fields = FieldMap::new().with(names::INSURER, FieldValue::text(""));
        let (outcome, evidence) = judge(&r, &fields, &ctx()).unwrap();
        assert_eq!(outcome, Outcome::Fail);
        assert_eq!(evidence.note.as_deref(), Some("absent: policy_number; empty: insurer"));

        let full = FieldMap::new()
            .with(names::POLICY_NUMBER, FieldValue::text("GL-1"))
            .with(names::INSURER, FieldValue::text("Hartford"));
        assert_eq!(judge(&r, &full, &ctx()).unwrap().0, Outcome::Pass);
    }
}
