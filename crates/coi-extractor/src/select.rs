//! Extractor chosen from configuration

use crate::config::{ExtractionMode, ExtractorConfig};
use crate::error::ExtractorError;
use crate::llm::LlmFieldExtractor;
use crate::pattern::PatternExtractor;
use coi_domain::traits::{FieldExtractor, LlmProvider};
use coi_domain::FieldMap;
use coi_llm::LlmError;
use tracing::info;

/// Either extractor, picked by [`ExtractionMode`]
pub enum ConfiguredExtractor<L> {
    /// Regular-expression extraction
    Pattern(PatternExtractor),
    /// Language model extraction
    Llm(LlmFieldExtractor<L>),
}

impl<L> ConfiguredExtractor<L>
where
    L: LlmProvider<Error = LlmError>,
{
    /// Build the extractor the configuration asks for
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Config`] when the mode is `llm` and no
    /// provider is available, or when the configuration is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_extractor::{ConfiguredExtractor, ExtractionMode, ExtractorConfig};
    /// use coi_llm::MockProvider;
    ///
    /// let extractor = ConfiguredExtractor::<MockProvider>::from_config(ExtractorConfig::default(), None).unwrap();
    /// assert_eq!(extractor.mode(), ExtractionMode::Pattern);
    ///
    /// let llm_only = ExtractorConfig { mode: ExtractionMode::Llm, ..ExtractorConfig::default() };
    /// assert!(ConfiguredExtractor::<MockProvider>::from_config(llm_only, None).is_err());
    /// ```
    pub fn from_config(config: ExtractorConfig, provider: Option<L>) -> Result<Self, ExtractorError> {
        match (config.mode, provider) {
            (ExtractionMode::Pattern, _) => Ok(Self::Pattern(PatternExtractor::new(config)?)),
            (ExtractionMode::Llm, Some(provider)) => {
                info!("Using language model field extraction");
                Ok(Self::Llm(LlmFieldExtractor::new(provider, config)?))
            }
            (ExtractionMode::Llm, None) => Err(ExtractorError::Config(
                "llm extraction mode needs a configured provider".to_string(),
            )),
        }
    }

    /// Mode of the selected extractor
    pub fn mode(&self) -> ExtractionMode {
        match self {
            Self::Pattern(_) => ExtractionMode::Pattern,
            Self::Llm(_) => ExtractionMode::Llm,
        }
    }
}

impl<L> FieldExtractor for ConfiguredExtractor<L>
where
    L: LlmProvider<Error = LlmError>,
{
    type Error = ExtractorError;

    fn extract(&self, text: &str) -> Result<FieldMap, Self::Error> {
        match self {
            Self::Pattern(extractor) => extractor.extract(text),
            Self::Llm(extractor) => extractor.extract(text),
        }
    }
}
