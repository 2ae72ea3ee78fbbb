//! LLM prompt for certificate field extraction

/// Builds prompts asking the model for a JSON field object
pub struct PromptBuilder<'a> {
    text: &'a str,
    max_chars: usize,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            max_chars: usize::MAX,
        }
    }

    /// Truncate the document text to this many characters
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let excerpt: String = self.text.chars().take(self.max_chars).collect();

        let mut prompt = String::new();
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\nCertificate text:\n---\n");
        prompt.push_str(&excerpt);
        prompt.push_str("\n---\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

/// JSON schema handed to providers that support structured output
pub const FIELD_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "policy_number": {"type": "string"},
    "insurer": {"type": "string"},
    "insured_name": {"type": "string"},
    "certificate_holder": {"type": "string"},
    "effective_date": {"type": "string"},
    "expiration_date": {"type": "string"},
    "coverage_limit": {"type": "object", "additionalProperties": {"type": "string"}},
    "additional_insureds": {"type": "array", "items": {"type": "string"}},
    "endorsements": {"type": "array", "items": {"type": "string"}},
    "cancellation_notice_days": {"type": "integer"}
  }
}"#;

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract the fields of the following Certificate of Insurance.

Fields:
- policy_number: the policy number as printed
- insurer: the insurance company providing coverage
- insured_name: the named insured
- certificate_holder: the certificate holder
- effective_date, expiration_date: dates as YYYY-MM-DD
- coverage_limit: object keyed by coverage type (general_liability,
  professional_liability, workers_compensation, automobile_liability,
  umbrella_liability), each the per-occurrence limit as a dollar amount
- additional_insureds: list of names
- endorsements: list of endorsement titles or form numbers
- cancellation_notice_days: number of days of written notice of cancellation

Rules:
- Omit a field entirely when the certificate does not state it
- Never guess or invent values
- Copy names exactly as printed"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (one JSON object only, no additional text):
{
  "policy_number": "GL-2024-001",
  "expiration_date": "2025-01-01",
  "coverage_limit": {"general_liability": "$1,000,000"},
  "additional_insureds": ["Riverside Property Group"],
  "cancellation_notice_days": 30
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;
