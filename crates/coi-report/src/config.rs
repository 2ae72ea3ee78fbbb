//! Configuration for report output

use coi_domain::ReportFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do with list evidence that cannot be flattened into one CSV cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonScalarPolicy {
    /// Write `see JSON` in the cell; the JSON report keeps the full value
    #[default]
    Flatten,
    /// Fail the build with a serialization error
    Reject,
}

/// Configuration for the report builder and the directory sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Formats the Report step produces
    pub formats: Vec<ReportFormat>,
    /// Handling of list evidence that contains the list separator
    pub non_scalar: NonScalarPolicy,
    /// Indent JSON output
    pub pretty_json: bool,
    /// Directory reports are written to
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            formats: vec![ReportFormat::Json, ReportFormat::Csv],
            non_scalar: NonScalarPolicy::Flatten,
            pretty_json: true,
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl ReportConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.formats.is_empty() {
            return Err("formats must name at least one report format".to_string());
        }
        let mut seen = Vec::new();
        for format in &self.formats {
            if seen.contains(format) {
                return Err(format!("format '{}' listed twice", format.extension()));
            }
            seen.push(*format);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
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
