//! Typing of raw extracted values by well-known field name

use coi_domain::field::parse_date;
use coi_domain::{names, FieldType, FieldValue, Money};

/// Type a well-known field is expected to carry, if the name is known
pub fn expected_type(name: &str) -> Option<FieldType> {
    match name {
        names::EFFECTIVE_DATE | names::EXPIRATION_DATE => Some(FieldType::Date),
        names::CANCELLATION_NOTICE_DAYS => Some(FieldType::Integer),
        names::ADDITIONAL_INSUREDS | names::ENDORSEMENTS => Some(FieldType::List),
        names::POLICY_NUMBER | names::INSURER | names::INSURED_NAME | names::CERTIFICATE_HOLDER => {
            Some(FieldType::Text)
        }
        _ if name.starts_with(names::COVERAGE_LIMIT_PREFIX) => Some(FieldType::Money),
        _ => None,
    }
}

/// Convert a raw value to the type its field name calls for
///
/// Values that do not convert are returned unchanged, so the evaluator can
/// report the coercion failure against the rule that reads them.
pub fn normalize(name: &str, value: FieldValue) -> FieldValue {
    let Some(expected) = expected_type(name) else {
        return value;
    };
    match (expected, value) {
        (FieldType::Date, FieldValue::Text(s)) => match parse_date(&s) {
            Ok(date) => FieldValue::Date(date),
            Err(_) => FieldValue::Text(s),
        },
        (FieldType::Money, FieldValue::Text(s)) => match Money::parse(&s) {
            Ok(amount) => FieldValue::Money(amount),
            Err(_) => FieldValue::Text(s),
        },
        (FieldType::Money, FieldValue::Integer(n)) => FieldValue::Money(Money::from_dollars(n)),
        (FieldType::Integer, value @ FieldValue::Text(_)) => match value.as_integer() {
            Ok(n) => FieldValue::Integer(n),
            Err(_) => value,
        },
        (FieldType::List, FieldValue::Text(s)) => FieldValue::List(split_list(&s)),
        (_, value) => value,
    }
}

/// Split a comma or semicolon separated line into trimmed items
pub fn split_list(line: &str) -> Vec<String> {
    line.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_known_fields_are_typed() {
        assert_eq!(
            normalize(names::EXPIRATION_DATE, FieldValue::text("01/01/2025")),
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        );
        assert_eq!(
            normalize("coverage_limit.general_liability", FieldValue::text("$1,000,000 / $2,000,000")),
            FieldValue::Money(Money::from_dollars(1_000_000))
        );
        assert_eq!(
            normalize(names::CANCELLATION_NOTICE_DAYS, FieldValue::text("30 days written notice")),
            FieldValue::Integer(30)
        );
        assert_eq!(
            normalize(names::ENDORSEMENTS, FieldValue::text("Waiver of Subrogation; Primary")),
            FieldValue::list(["Waiver of Subrogation", "Primary"])
        );
    }

    #[test]
    fn test_unparsable_values_stay_text() {
        assert_eq!(
            normalize(names::EXPIRATION_DATE, FieldValue::text("until further notice")),
            FieldValue::text("until further notice")
        );
        assert_eq!(
            normalize("coverage_limit.umbrella", FieldValue::text("statutory")),
            FieldValue::text("statutory")
        );
    }

    #[test]
    fn test_unknown_fields_untouched() {
        assert_eq!(normalize("producer", FieldValue::text("01/01/2025")), FieldValue::text("01/01/2025"));
        assert_eq!(expected_type("producer"), None);
    }
}
