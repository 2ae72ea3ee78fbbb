//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use coi_extractor::ExtractorConfig;
use coi_llm::GeminiConfig;
use coi_pipeline::PipelineConfig;
use coi_rules::CompliancePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default run log location, relative to the working directory
pub const DEFAULT_RUN_LOG: &str = "coi-runs.db";

/// CLI configuration, one TOML file with a table per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite run log
    pub run_log: PathBuf,

    /// Rule file used instead of the policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,

    /// Output settings
    pub settings: Settings,

    /// Step attempts, timeouts and report output
    pub pipeline: PipelineConfig,

    /// Field extraction
    pub extractor: ExtractorConfig,

    /// Standard compliance checks
    pub policy: CompliancePolicy,

    /// Gemini provider
    pub gemini: GeminiConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_log: PathBuf::from(DEFAULT_RUN_LOG),
            rules_file: None,
            settings: Settings::default(),
            pipeline: PipelineConfig::default(),
            extractor: ExtractorConfig::default(),
            policy: CompliancePolicy::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Configuration built from the named pipeline and extractor presets
    ///
    /// `aggressive` pairs with strict rules, `lenient` with permissive ones.
    pub fn preset(name: &str) -> Option<Self> {
        let pipeline = PipelineConfig::preset(name)?;
        let extractor = ExtractorConfig::preset(name)?;
        let policy = match name {
            "aggressive" => CompliancePolicy::strict(),
            "lenient" => CompliancePolicy::permissive(),
            _ => CompliancePolicy::default(),
        };
        Some(Self {
            pipeline,
            extractor,
            policy,
            ..Self::default()
        })
    }

    /// Load configuration from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents).map_err(CliError::Config)?;
        config.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.run_log.as_os_str().is_empty() {
            return Err("run_log cannot be empty".to_string());
        }
        self.pipeline.validate()?;
        self.extractor.validate()?;
        self.policy.validate()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
