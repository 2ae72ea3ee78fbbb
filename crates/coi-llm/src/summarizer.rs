//! Narrative summaries backed by a language model

use crate::LlmError;
use coi_domain::traits::{LlmProvider, Summarizer};
use coi_domain::ComplianceResult;
use serde_json::json;

/// Maximum characters of document text sent to the model
pub const DEFAULT_MAX_TEXT_CHARS: usize = 20_000;

/// Summarizer that asks a language model for a stakeholder-facing narrative
///
/// # Examples
///
/// ```
/// use coi_llm::{LlmSummarizer, MockProvider};
/// use coi_domain::traits::Summarizer;
/// use coi_domain::{ComplianceResult, DocumentId, RunId};
///
/// let summarizer = LlmSummarizer::new(MockProvider::new("All coverage is in order."));
/// let result = ComplianceResult::new(RunId::new(), DocumentId::new("acme.txt"), vec![]);
/// assert_eq!(summarizer.summarize("COI text", &result).unwrap(), "All coverage is in order.");
/// ```
pub struct LlmSummarizer<L> {
    provider: L,
    max_text_chars: usize,
}

impl<L> LlmSummarizer<L>
where
    L: LlmProvider<Error = LlmError>,
{
    /// Create a summarizer over a provider
    pub fn new(provider: L) -> Self {
        Self {
            provider,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }

    /// Truncate document text to this many characters before prompting
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    /// The underlying provider
    pub fn provider(&self) -> &L {
        &self.provider
    }

    fn build_prompt(&self, text: &str, result: &ComplianceResult) -> String {
        let findings: Vec<_> = result
            .verdicts
            .iter()
            .map(|v| {
                json!({
                    "rule": v.rule_id,
                    "outcome": v.outcome,
                    "severity": v.severity,
                    "note": v.evidence.note,
                    "error": v.evidence.error,
                })
            })
            .collect();
        let findings = serde_json::to_string_pretty(&findings).unwrap_or_default();
        let excerpt: String = text.chars().take(self.max_text_chars).collect();

        format!(
            "You review Certificates of Insurance for compliance.\n\
             Write a short summary for stakeholders: overall status, critical issues, \
             and recommended next steps. Use plain prose.\n\n\
             OVERALL STATUS: {}\n\n\
             RULE FINDINGS:\n{}\n\n\
             DOCUMENT TEXT:\n{}\n",
            result.status, findings, excerpt
        )
    }
}

impl<L> Summarizer for LlmSummarizer<L>
where
    L: LlmProvider<Error = LlmError>,
{
    type Error = LlmError;

    fn summarize(&self, text: &str, result: &ComplianceResult) -> Result<String, Self::Error> {
        let prompt = self.build_prompt(text, result);
        let summary = self.provider.generate(&prompt)?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(LlmError::InvalidResponse("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}
