//! Field module - typed values extracted from a COI document

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known field names produced by the shipped extractors
///
/// Rules may reference any field name; these are the ones the standard
/// compliance policy targets.
pub mod names {
    /// Policy number printed on the certificate
    pub const POLICY_NUMBER: &str = "policy_number";
    /// Insurance company issuing the policy
    pub const INSURER: &str = "insurer";
    /// Named insured
    pub const INSURED_NAME: &str = "insured_name";
    /// Certificate holder
    pub const CERTIFICATE_HOLDER: &str = "certificate_holder";
    /// Policy effective date
    pub const EFFECTIVE_DATE: &str = "effective_date";
    /// Policy expiration date
    pub const EXPIRATION_DATE: &str = "expiration_date";
    /// Additional insured parties
    pub const ADDITIONAL_INSUREDS: &str = "additional_insureds";
    /// Endorsements attached to the policy
    pub const ENDORSEMENTS: &str = "endorsements";
    /// Written notice period before cancellation, in days
    pub const CANCELLATION_NOTICE_DAYS: &str = "cancellation_notice_days";

    /// Prefix of per-coverage limit fields
    pub const COVERAGE_LIMIT_PREFIX: &str = "coverage_limit.";

    /// Field name holding the limit of a coverage type
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::names;
    ///
    /// assert_eq!(names::coverage_limit("general_liability"), "coverage_limit.general_liability");
    /// ```
    pub fn coverage_limit(coverage_type: &str) -> String {
        format!("{}{}", COVERAGE_LIMIT_PREFIX, coverage_type)
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Calendar date
    Date,
    /// Monetary amount
    Money,
    /// Free text
    Text,
    /// List of strings (endorsements, additional insureds)
    List,
    /// Whole number (notice days)
    Integer,
}

impl FieldType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Date => "date",
            FieldType::Money => "money",
            FieldType::Text => "text",
            FieldType::List => "list",
            FieldType::Integer => "integer",
        }
    }

    /// Parse a type name; `None` for unknown names
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(FieldType::Date),
            "money" => Some(FieldType::Money),
            "text" | "string" => Some(FieldType::Text),
            "list" => Some(FieldType::List),
            "integer" | "int" => Some(FieldType::Integer),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present field whose value could not be read as the requested type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    /// The raw value that failed to coerce
    pub value: String,
    /// The type that was requested
    pub expected: FieldType,
    /// Human-readable reason
    pub reason: String,
}

impl CoercionError {
    /// Create a new coercion error
    pub fn new(value: impl Into<String>, expected: FieldType, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expected,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot read '{}' as {}: {}",
            self.value, self.expected, self.reason
        )
    }
}

impl std::error::Error for CoercionError {}

/// Monetary amount stored as integer cents
///
/// Serialized as a display string (`"$1,000,000"`); deserializes from either
/// such a string or a whole-dollar integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Create an amount from cents
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create an amount from whole dollars
    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Get the amount in cents
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parse an amount such as `$1,000,000`, `2500.50` or `$1,000,000 / $2,000,000`
    ///
    /// Split limits (`per occurrence / aggregate`) yield the first figure.
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::Money;
    ///
    /// assert_eq!(Money::parse("$1,000,000").unwrap(), Money::from_dollars(1_000_000));
    /// assert_eq!(Money::parse("$1,000,000 / $2,000,000").unwrap(), Money::from_dollars(1_000_000));
    /// assert!(Money::parse("one million").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, CoercionError> {
        let first = input.split('/').next().unwrap_or_default().trim();
        let cleaned: String = first
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' ' | '_'))
            .collect();

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        let well_formed = !whole.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && frac.len() <= 2
            && frac.chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(CoercionError::new(input, FieldType::Money, "not a monetary amount"));
        }

        let overflow = || CoercionError::new(input, FieldType::Money, "amount out of range");
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => frac.parse().map_err(|_| overflow())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(overflow)?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}", grouped)?;
        if cents != 0 {
            write!(f, ".{:02}", cents)?;
        }
        Ok(())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Dollars(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Dollars(d) => d.checked_mul(100).map(Money::from_cents).ok_or_else(|| {
                serde::de::Error::custom(format!("amount of {} dollars is out of range", d))
            }),
            Repr::Text(s) => Money::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Date layouts accepted when a date arrives as text
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%m-%d-%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a date written in one of the layouts common on certificates
///
/// # Examples
///
/// ```
/// use coi_domain::field::parse_date;
/// use chrono::NaiveDate;
///
/// let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// assert_eq!(parse_date("01/15/2024").unwrap(), expected);
/// assert_eq!(parse_date("January 15, 2024").unwrap(), expected);
/// assert!(parse_date("sometime next year").is_err());
/// ```
pub fn parse_date(input: &str) -> Result<NaiveDate, CoercionError> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        // `%Y` happily reads "24" as year 24; two-digit years go through `%y`
        .find(|date| chrono::Datelike::year(date) >= 1900)
        .ok_or_else(|| CoercionError::new(input, FieldType::Date, "unrecognised date format"))
}

/// A single extracted value
///
/// Serialized adjacently tagged (`{"type": "date", "value": "2024-01-01"}`)
/// so a FieldMap survives a round trip through the run log unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Free text, possibly an unparsed date or amount
    Text(String),
    /// Parsed date
    Date(NaiveDate),
    /// Parsed amount
    Money(Money),
    /// Whole number
    Integer(i64),
    /// List of strings
    List(Vec<String>),
}

impl FieldValue {
    /// Convenience constructor for text values
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Convenience constructor for list values
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// The type this value currently holds
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Money(_) => FieldType::Money,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::List(_) => FieldType::List,
        }
    }

    /// Blank text or an empty list
    ///
    /// Emptiness is not absence: an empty field is present in the map.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Whether the value is a single scalar (everything but lists)
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldValue::List(_))
    }

    /// Read the value as a date, parsing text if needed
    pub fn as_date(&self) -> Result<NaiveDate, CoercionError> {
        match self {
            FieldValue::Date(d) => Ok(*d),
            FieldValue::Text(s) => parse_date(s),
            other => Err(self.mismatch(other, FieldType::Date)),
        }
    }

    /// Read the value as money, parsing text if needed
    pub fn as_money(&self) -> Result<Money, CoercionError> {
        match self {
            FieldValue::Money(m) => Ok(*m),
            FieldValue::Text(s) => Money::parse(s),
            FieldValue::Integer(n) => Ok(Money::from_dollars(*n)),
            other => Err(self.mismatch(other, FieldType::Money)),
        }
    }

    /// Read the value as an integer
    ///
    /// Text yields its first run of digits, so `"30 days written notice"`
    /// reads as 30.
    pub fn as_integer(&self) -> Result<i64, CoercionError> {
        match self {
            FieldValue::Integer(n) => Ok(*n),
            FieldValue::Text(s) => {
                let digits: String = s
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits
                    .parse()
                    .map_err(|_| CoercionError::new(s.as_str(), FieldType::Integer, "no number found"))
            }
            other => Err(self.mismatch(other, FieldType::Integer)),
        }
    }

    /// Read the value as a list; a single text value becomes a one-item list
    pub fn as_list(&self) -> Result<Vec<String>, CoercionError> {
        match self {
            FieldValue::List(items) => Ok(items.clone()),
            FieldValue::Text(s) => Ok(vec![s.clone()]),
            other => Err(self.mismatch(other, FieldType::List)),
        }
    }

    fn mismatch(&self, other: &FieldValue, expected: FieldType) -> CoercionError {
        CoercionError::new(
            other.to_string(),
            expected,
            format!("field holds a {} value", other.field_type()),
        )
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Money(m) => write!(f, "{}", m),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Named fields extracted from one document
///
/// Built by value and never mutated afterwards. Keys are kept sorted so
/// iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    /// Create an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a map that additionally holds `name = value`
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::{FieldMap, FieldValue};
    ///
    /// let fields = FieldMap::new()
    ///     .with("policy_number", FieldValue::text("GL-123"))
    ///     .with("endorsements", FieldValue::list(["waiver of subrogation"]));
    /// assert_eq!(fields.len(), 2);
    /// assert!(fields.contains("policy_number"));
    /// assert!(!fields.contains("insurer"));
    /// ```
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Get a field by name; `None` means absent
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Whether the field is present (possibly empty)
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of present fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field was extracted at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_parse_variants() {
        assert_eq!(Money::parse("$2,000,000").unwrap().cents(), 200_000_000);
        assert_eq!(Money::parse("1500.5").unwrap().cents(), 150_050);
        assert_eq!(Money::parse("$1,000.25").unwrap().cents(), 100_025);
        assert_eq!(Money::parse("-$10").unwrap().cents(), -1_000);
        assert!(Money::parse("").is_err());
        assert!(Money::parse("$1.234").is_err());
        assert!(Money::parse("N/A").is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_dollars(1_000_000).to_string(), "$1,000,000");
        assert_eq!(Money::from_cents(123_456).to_string(), "$1,234.56");
        assert_eq!(Money::from_dollars(0).to_string(), "$0");
        assert_eq!(Money::from_dollars(-500).to_string(), "-$500");
    }

    #[test]
    fn test_money_serde_accepts_dollars_and_text() {
        let from_int: Money = serde_json::from_str("1000000").unwrap();
        let from_text: Money = serde_json::from_str("\"$1,000,000\"").unwrap();
        assert_eq!(from_int, from_text);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"$1,000,000\"");
    }

    #[test]
    fn test_money_serde_rejects_dollars_beyond_cents_range() {
        let err = serde_json::from_str::<Money>(&i64::MAX.to_string()).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let largest = i64::MAX / 100;
        let money: Money = serde_json::from_str(&largest.to_string()).unwrap();
        assert_eq!(money.cents(), largest * 100);
    }

    #[test]
    fn test_parse_date_two_digit_year() {
        let date = parse_date("01/15/24").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_coercion_from_text() {
        let value = FieldValue::text("2023-01-01");
        assert_eq!(value.as_date().unwrap(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());

        let notice = FieldValue::text("30 days written notice");
        assert_eq!(notice.as_integer().unwrap(), 30);

        let bad = FieldValue::text("soon");
        let err = bad.as_date().unwrap_err();
        assert_eq!(err.expected, FieldType::Date);
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn test_coercion_type_mismatch() {
        let list = FieldValue::list(["a", "b"]);
        assert!(list.as_date().is_err());
        assert!(list.as_money().is_err());
        assert_eq!(FieldValue::text("solo").as_list().unwrap(), vec!["solo".to_string()]);
    }

    #[test]
    fn test_empty_is_not_absent() {
        let fields = FieldMap::new().with("insurer", FieldValue::text("  "));
        assert!(fields.contains("insurer"));
        assert!(fields.get("insurer").unwrap().is_empty());
        assert!(fields.get("insured_name").is_none());
    }

    #[test]
    fn test_field_value_serde_round_trip_keeps_type() {
        let fields = FieldMap::new()
            .with("expiration_date", FieldValue::Date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()))
            .with("coverage_limit.general_liability", FieldValue::Money(Money::from_dollars(1_000_000)))
            .with("cancellation_notice_days", FieldValue::Integer(30));

        let json = serde_json::to_string(&fields).unwrap();
        let back: FieldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(fields, back);
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!(FieldType::parse("DATE"), Some(FieldType::Date));
        assert_eq!(FieldType::parse("string"), Some(FieldType::Text));
        assert_eq!(FieldType::parse("currency"), None);
    }
}
