//! Regular-expression field extraction
//!
//! Heuristics for the fields printed on a typical ACORD 25 style certificate.
//! Each field has an ordered list of patterns; the first that matches wins.
//! Nothing here fails on unexpected text: fields that are not found are
//! simply absent from the map.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::normalize::{normalize, split_list};
use coi_domain::traits::FieldExtractor;
use coi_domain::{names, FieldMap, FieldValue};
use regex::Regex;
use tracing::debug;

/// Date layouts recognised in running text
const DATE: &str = r"\d{4}-\d{2}-\d{2}|\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{2,4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{2,4}";

/// Name-like run of characters on a single line
const NAME: &str = r"[A-Z][A-Za-z0-9 &.,'\-]+";

/// Amount, optionally split (`$1,000,000 / $2,000,000`)
const AMOUNT: &str = r"\$[\d,]+(?:\.\d{2})?(?:\s*/\s*\$[\d,]+(?:\.\d{2})?)*";

/// Coverage types searched for, with the label that introduces them
const COVERAGES: &[(&str, &str)] = &[
    ("general_liability", r"general\s*liability"),
    ("professional_liability", r"professional\s*liability"),
    ("workers_compensation", r"workers?\s*comp(?:ensation)?"),
    ("automobile_liability", r"auto(?:mobile)?\s*liability"),
    ("umbrella_liability", r"(?:umbrella|excess)\s*liability"),
];

/// Field extractor built from regular expressions
pub struct PatternExtractor {
    policy_number: Vec<Regex>,
    effective_date: Vec<Regex>,
    expiration_date: Vec<Regex>,
    insurer: Vec<Regex>,
    named_insured: Regex,
    insured: Regex,
    certificate_holder: Vec<Regex>,
    additional_insured: Regex,
    endorsements: Regex,
    cancellation: Regex,
    coverages: Vec<(String, Regex)>,
    config: ExtractorConfig,
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

impl PatternExtractor {
    /// Compile the patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_extractor::{ExtractorConfig, PatternExtractor};
    /// use coi_domain::traits::FieldExtractor;
    ///
    /// let extractor = PatternExtractor::new(ExtractorConfig::default()).unwrap();
    /// let fields = extractor.extract("Policy Number: GL-2024-001").unwrap();
    /// assert_eq!(fields.get("policy_number").unwrap().to_string(), "GL-2024-001");
    /// ```
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let policy_number = compile(&[
            r"(?i)\bpolicy\s*(?:no\.?|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9\-]*)".to_string(),
            r"(?i)\bpol\s*(?:no\.?|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9\-]*)".to_string(),
            r"(?i)\bcertificate\s*(?:no\.?|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9\-]*)".to_string(),
        ])?;
        let effective_date = compile(&[
            format!(r"(?i)\beffective\s*(?:date)?\s*:?\s*({})", DATE),
            format!(r"(?i)\bpolicy\s*period\s*:?\s*({})", DATE),
        ])?;
        let expiration_date = compile(&[
            format!(r"(?i)\bexpir(?:ation|es?|y)\s*(?:date)?\s*:?\s*({})", DATE),
            format!(r"(?i)\bpolicy\s*period\s*:?\s*(?:{})\s*(?:to|through|-)\s*({})", DATE, DATE),
        ])?;
        let insurer = compile(&[
            r"(?i)\bcompany[ \t]*:?[ \t]*([A-Z][A-Za-z &.,]+(?:insurance|ins|assurance|mutual|company)\b)".to_string(),
            r"(?i)\binsurer(?:[ \t]+[A-F]\b)?[ \t]*:?[ \t]*([A-Z][A-Za-z &.,]+(?:insurance|ins|assurance|mutual|company)\b)".to_string(),
            r"(?i)\bcarrier[ \t]*:?[ \t]*([A-Z][A-Za-z &.,]+(?:insurance|ins|assurance|mutual|company)\b)".to_string(),
        ])?;
        let named_insured = Regex::new(&format!(r"(?i)\bnamed\s*insured\s*:?[ \t]*({})", NAME))?;
        let insured = Regex::new(&format!(r"(?i)(additional\s*)?\binsured\s*:?[ \t]*({})", NAME))?;
        let certificate_holder = compile(&[
            format!(r"(?i)\bcertificate\s*holder\s*:?[ \t]*({})", NAME),
            format!(r"(?i)\bholder\s*:?[ \t]*({})", NAME),
        ])?;
        let additional_insured = Regex::new(&format!(r"(?i)\badditional\s*insureds?\s*:?[ \t]*({})", NAME))?;
        let endorsements = Regex::new(r"(?im)^\s*endorsements?\s*:[ \t]*(.+)$")?;
        let cancellation = Regex::new(r"(?is)cancell?ation.*?(\d+)\s*days?'?\s*(?:prior\s*|advance\s*)?(?:written\s*)?notice")?;
        let coverages = COVERAGES
            .iter()
            .map(|(coverage_type, label)| {
                Regex::new(&format!(r"(?is){}.*?({})", label, AMOUNT))
                    .map(|re| (coverage_type.to_string(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            policy_number,
            effective_date,
            expiration_date,
            insurer,
            named_insured,
            insured,
            certificate_holder,
            additional_insured,
            endorsements,
            cancellation,
            coverages,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn insured_name(&self, text: &str) -> Option<String> {
        if let Some(name) = first_capture(std::slice::from_ref(&self.named_insured), text) {
            return Some(name);
        }
        // "Additional Insured:" lines name someone else
        self.insured
            .captures_iter(text)
            .find(|caps| caps.get(1).is_none())
            .and_then(|caps| caps.get(2))
            .map(|m| clean(m.as_str()))
            .filter(|name| !name.is_empty())
    }

    fn policy_number(&self, text: &str) -> Option<String> {
        // A bare word such as "Period" after "Policy" is not a number
        self.policy_number.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .find(|candidate| candidate.chars().any(|c| c.is_ascii_digit()))
        })
    }

    fn additional_insureds(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for caps in self.additional_insured.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let name = clean(m.as_str());
                if !name.is_empty() && !found.contains(&name) {
                    found.push(name);
                }
            }
        }
        found
    }

    /// Run every pattern over `text` and return the raw fields found
    pub fn scan(&self, text: &str) -> FieldMap {
        let mut fields: Vec<(String, FieldValue)> = Vec::new();
        let mut put = |name: &str, value: FieldValue| fields.push((name.to_string(), value));

        if let Some(v) = self.policy_number(text) {
            put(names::POLICY_NUMBER, FieldValue::text(v));
        }
        if let Some(v) = first_capture(&self.effective_date, text) {
            put(names::EFFECTIVE_DATE, FieldValue::text(v));
        }
        if let Some(v) = first_capture(&self.expiration_date, text) {
            put(names::EXPIRATION_DATE, FieldValue::text(v));
        }
        if let Some(v) = first_capture(&self.insurer, text) {
            put(names::INSURER, FieldValue::text(v));
        }
        if let Some(v) = self.insured_name(text) {
            put(names::INSURED_NAME, FieldValue::text(v));
        }
        if let Some(v) = first_capture(&self.certificate_holder, text) {
            put(names::CERTIFICATE_HOLDER, FieldValue::text(v));
        }
        let additional = self.additional_insureds(text);
        if !additional.is_empty() {
            put(names::ADDITIONAL_INSUREDS, FieldValue::List(additional));
        }
        if let Some(caps) = self.endorsements.captures(text) {
            if let Some(line) = caps.get(1) {
                put(names::ENDORSEMENTS, FieldValue::List(split_list(line.as_str())));
            }
        }
        if let Some(days) = self.cancellation.captures(text).and_then(|c| c.get(1)) {
            put(names::CANCELLATION_NOTICE_DAYS, FieldValue::text(days.as_str()));
        }
        for (coverage_type, re) in &self.coverages {
            if let Some(amount) = re.captures(text).and_then(|c| c.get(1)) {
                put(&names::coverage_limit(coverage_type), FieldValue::text(amount.as_str()));
            }
        }

        fields.into_iter().collect()
    }
}

/// First capture group of the first pattern that matches
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| clean(m.as_str()))
        .filter(|value| !value.is_empty())
}

fn clean(value: &str) -> String {
    value
        .trim()
        .trim_end_matches([',', '.', '-', ' '])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl FieldExtractor for PatternExtractor {
    type Error = ExtractorError;

    fn extract(&self, text: &str) -> Result<FieldMap, Self::Error> {
        if text.len() > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(text.len(), self.config.max_text_length));
        }

        let raw = self.scan(text);
        debug!("Pattern extraction found {} fields", raw.len());

        if !self.config.typed_values {
            return Ok(raw);
        }
        Ok(raw
            .iter()
            .map(|(name, value)| (name.to_string(), normalize(name, value.clone())))
            .collect())
    }
}
