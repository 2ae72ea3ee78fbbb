//! Configuration for the field extractors

use serde::{Deserialize, Serialize};

/// Which extractor the pipeline should build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Regular-expression heuristics, no network
    #[default]
    Pattern,
    /// Ask a language model for a JSON field object
    Llm,
}

/// Configuration for the field extractors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Extractor to use
    pub mode: ExtractionMode,

    /// Maximum input text length (characters)
    pub max_text_length: usize,

    /// Maximum characters of document text placed in an LLM prompt
    pub max_prompt_chars: usize,

    /// Fill fields the model left out from the pattern extractor
    pub fallback_to_patterns: bool,

    /// Convert dates, amounts and day counts to typed values when they parse.
    /// Unparsable values are kept as text so evaluation reports the coercion error.
    pub typed_values: bool,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Pattern,
            max_text_length: 200_000,
            max_prompt_chars: 30_000,
            fallback_to_patterns: true,
            typed_values: true,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: small inputs, model output taken as-is
    pub fn aggressive() -> Self {
        Self {
            mode: ExtractionMode::Llm,
            max_text_length: 50_000,
            max_prompt_chars: 10_000,
            fallback_to_patterns: false,
            typed_values: true,
        }
    }

    /// Lenient preset: large inputs, raw text values
    pub fn lenient() -> Self {
        Self {
            mode: ExtractionMode::Pattern,
            max_text_length: 1_000_000,
            max_prompt_chars: 60_000,
            fallback_to_patterns: true,
            typed_values: false,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "aggressive" => Some(Self::aggressive()),
            "lenient" => Some(Self::lenient()),
            _ => None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.max_prompt_chars == 0 {
            return Err("max_prompt_chars must be greater than 0".to_string());
        }
        if self.max_prompt_chars > self.max_text_length {
            return Err("max_prompt_chars cannot exceed max_text_length".to_string());
        }
        Ok(())
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
    fn test_presets_are_valid() {
        for name in ["default", "aggressive", "lenient"] {
            let config = ExtractorConfig::preset(name).unwrap();
            assert!(config.validate().is_ok(), "{} preset invalid", name);
        }
        assert!(ExtractorConfig::preset("fast").is_none());
    }

    #[test]
    fn test_invalid_max_text_length() {
        let config = ExtractorConfig {
            max_text_length: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prompt_larger_than_text_rejected() {
        let mut config = ExtractorConfig::default();
        config.max_prompt_chars = config.max_text_length + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_and_partial() {
        let config = ExtractorConfig::aggressive();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("mode = \"llm\""));
        assert_eq!(ExtractorConfig::from_toml(&toml_str).unwrap(), config);

        let partial = ExtractorConfig::from_toml("typed_values = false").unwrap();
        assert!(!partial.typed_values);
        assert_eq!(partial.mode, ExtractionMode::Pattern);
    }
}
