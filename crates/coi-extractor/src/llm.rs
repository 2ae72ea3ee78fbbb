//! Field extraction backed by a language model

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::normalize::normalize;
use crate::parser::parse_llm_response;
use crate::pattern::PatternExtractor;
use crate::prompt::{PromptBuilder, FIELD_SCHEMA};
use coi_domain::traits::{FieldExtractor, LlmProvider};
use coi_domain::FieldMap;
use coi_llm::LlmError;
use tracing::{debug, info};

/// Extractor that asks a language model for a JSON field object
///
/// When `fallback_to_patterns` is set, fields the model leaves out are
/// filled from a [`PatternExtractor`] scan of the same text. Model values
/// always take precedence.
///
/// # Examples
///
/// ```
/// use coi_extractor::{ExtractorConfig, LlmFieldExtractor};
/// use coi_domain::traits::FieldExtractor;
/// use coi_llm::MockProvider;
///
/// let llm = MockProvider::new(r#"{"policy_number": "GL-1", "expiration_date": "2025-01-01"}"#);
/// let extractor = LlmFieldExtractor::new(llm, ExtractorConfig::default()).unwrap();
/// let fields = extractor.extract("certificate text").unwrap();
/// assert_eq!(fields.get("expiration_date").unwrap().to_string(), "2025-01-01");
/// ```
pub struct LlmFieldExtractor<L> {
    provider: L,
    fallback: Option<PatternExtractor>,
    config: ExtractorConfig,
}

impl<L> LlmFieldExtractor<L>
where
    L: LlmProvider<Error = LlmError>,
{
    /// Create a new extractor over a provider
    pub fn new(provider: L, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let fallback = if config.fallback_to_patterns {
            Some(PatternExtractor::new(config.clone())?)
        } else {
            None
        };
        Ok(Self {
            provider,
            fallback,
            config,
        })
    }

    /// The underlying provider
    pub fn provider(&self) -> &L {
        &self.provider
    }
}

impl<L> FieldExtractor for LlmFieldExtractor<L>
where
    L: LlmProvider<Error = LlmError>,
{
    type Error = ExtractorError;

    fn extract(&self, text: &str) -> Result<FieldMap, Self::Error> {
        if text.len() > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(text.len(), self.config.max_text_length));
        }

        let prompt = PromptBuilder::new(text)
            .with_max_chars(self.config.max_prompt_chars)
            .build();
        debug!("Prompt length: {} chars", prompt.len());

        let response = self.provider.generate_structured(&prompt, FIELD_SCHEMA)?;
        debug!("LLM response length: {} chars", response.len());

        let from_model = parse_llm_response(&response)?;
        info!("Model returned {} fields", from_model.len());

        let fields: FieldMap = match &self.fallback {
            Some(patterns) => {
                let scanned = patterns.scan(text);
                let filled: Vec<_> = scanned
                    .iter()
                    .filter(|(name, _)| !from_model.contains(name))
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                if !filled.is_empty() {
                    debug!("Filled {} fields from patterns", filled.len());
                }
                from_model
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .chain(filled)
                    .collect()
            }
            None => from_model,
        };

        if !self.config.typed_values {
            return Ok(fields);
        }
        Ok(fields
            .iter()
            .map(|(name, value)| (name.to_string(), normalize(name, value.clone())))
            .collect())
    }
}
