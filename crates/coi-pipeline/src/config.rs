//! Configuration for the pipeline orchestrator

use coi_report::ReportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts and timeout for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicy {
    /// Attempts including the first; only transient failures are retried
    pub max_attempts: u32,
    /// Timeout of a single attempt (milliseconds)
    pub timeout_ms: u64,
}

impl StepPolicy {
    /// Policy with the given attempts and timeout
    pub const fn new(max_attempts: u32, timeout_ms: u64) -> Self {
        Self {
            max_attempts,
            timeout_ms,
        }
    }

    /// Get the attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self, step: &str) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err(format!("{}.max_attempts must be greater than 0", step));
        }
        if self.timeout_ms == 0 {
            return Err(format!("{}.timeout_ms must be greater than 0", step));
        }
        Ok(())
    }
}

/// Exponential backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the second attempt (milliseconds)
    pub initial_delay_ms: u64,
    /// Factor applied for each further attempt
    pub multiplier: f64,
    /// Upper bound of any delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl BackoffConfig {
    /// Delay to wait after failed attempt number `attempt` (starting at 1)
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_pipeline::BackoffConfig;
    /// use std::time::Duration;
    ///
    /// let backoff = BackoffConfig::default();
    /// assert_eq!(backoff.delay(1), Duration::from_millis(500));
    /// assert_eq!(backoff.delay(2), Duration::from_millis(1000));
    /// assert_eq!(backoff.delay(20), Duration::from_millis(10_000));
    /// ```
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("backoff.multiplier must be a finite number >= 1.0".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("backoff.max_delay_ms cannot be less than initial_delay_ms".to_string());
        }
        Ok(())
    }
}

/// Configuration for the pipeline orchestrator
///
/// Evaluate has a timeout but no attempt count: it is never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the Summarize step
    pub summarize_enabled: bool,
    /// Runs a batch executes at the same time
    pub max_concurrent_runs: usize,
    /// Evaluate timeout (milliseconds)
    pub evaluate_timeout_ms: u64,
    /// Ingest attempts and timeout
    pub ingest: StepPolicy,
    /// Extract attempts and timeout
    pub extract: StepPolicy,
    /// Summarize attempts and timeout
    pub summarize: StepPolicy,
    /// Report attempts and timeout
    pub report: StepPolicy,
    /// Delay between attempts
    pub backoff: BackoffConfig,
    /// Report formats and output
    pub reports: ReportConfig,
}

impl Default for PipelineConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            summarize_enabled: true,
            max_concurrent_runs: 4,
            ingest: StepPolicy::new(3, 30_000),
            extract: StepPolicy::new(3, 120_000),
            evaluate_timeout_ms: 30_000,
            summarize: StepPolicy::new(1, 60_000),
            report: StepPolicy::new(2, 30_000),
            backoff: BackoffConfig::default(),
            reports: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Aggressive preset: short timeouts, few attempts, no summary
    pub fn aggressive() -> Self {
        Self {
            summarize_enabled: false,
            max_concurrent_runs: 8,
            ingest: StepPolicy::new(2, 10_000),
            extract: StepPolicy::new(2, 60_000),
            evaluate_timeout_ms: 10_000,
            summarize: StepPolicy::new(1, 30_000),
            report: StepPolicy::new(2, 10_000),
            backoff: BackoffConfig {
                initial_delay_ms: 200,
                multiplier: 2.0,
                max_delay_ms: 2_000,
            },
            reports: ReportConfig::default(),
        }
    }

    /// Lenient preset: long timeouts, more attempts
    pub fn lenient() -> Self {
        Self {
            summarize_enabled: true,
            max_concurrent_runs: 2,
            ingest: StepPolicy::new(5, 60_000),
            extract: StepPolicy::new(5, 300_000),
            evaluate_timeout_ms: 60_000,
            summarize: StepPolicy::new(2, 120_000),
            report: StepPolicy::new(2, 60_000),
            backoff: BackoffConfig {
                initial_delay_ms: 1_000,
                multiplier: 2.0,
                max_delay_ms: 30_000,
            },
            reports: ReportConfig::default(),
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

    /// Get the evaluate timeout as a Duration
    pub fn evaluate_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluate_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_runs == 0 {
            return Err("max_concurrent_runs must be greater than 0".to_string());
        }
        if self.evaluate_timeout_ms == 0 {
            return Err("evaluate_timeout_ms must be greater than 0".to_string());
        }
        self.ingest.validate("ingest")?;
        self.extract.validate("extract")?;
        self.summarize.validate("summarize")?;
        self.report.validate("report")?;
        self.backoff.validate()?;
        self.reports.validate()
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
            assert!(PipelineConfig::preset(name).unwrap().validate().is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_default_retries_report_once_and_summarize_never() {
        let config = PipelineConfig::default();
        assert_eq!(config.report.max_attempts, 2);
        assert_eq!(config.summarize.max_attempts, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.extract.max_attempts = 0;
        assert!(config.validate().unwrap_err().contains("extract.max_attempts"));

        let mut config = PipelineConfig::default();
        config.backoff.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.max_concurrent_runs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_and_partial() {
        let config = PipelineConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&toml_str).unwrap(), config);

        let partial = PipelineConfig::from_toml(
            "summarize_enabled = false\n[extract]\nmax_attempts = 7\ntimeout_ms = 1000\n",
        )
        .unwrap();
        assert!(!partial.summarize_enabled);
        assert_eq!(partial.extract, StepPolicy::new(7, 1000));
        assert_eq!(partial.ingest, PipelineConfig::default().ingest);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = BackoffConfig {
            initial_delay_ms: 100,
            multiplier: 3.0,
            max_delay_ms: 1_000,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(300));
        assert_eq!(backoff.delay(3), Duration::from_millis(900));
        assert_eq!(backoff.delay(4), Duration::from_millis(1_000));
    }
}
