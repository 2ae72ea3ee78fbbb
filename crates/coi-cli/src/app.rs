//! Pipeline assembly from configuration and command-line arguments.

use crate::cli::ModelArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use chrono::{NaiveDate, Utc};
use coi_domain::EvaluationContext;
use coi_extractor::ConfiguredExtractor;
use coi_llm::{GeminiProvider, LlmSummarizer};
use coi_pipeline::{Collaborators, FileSource, PipelineOrchestrator};
use coi_report::DirectorySink;
use coi_rules::{CompliancePolicy, RuleSet, RuleSource};
use coi_store::SqliteRunLog;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The pipeline the `coi` binary runs
pub type CliPipeline = PipelineOrchestrator<
    FileSource,
    ConfiguredExtractor<GeminiProvider>,
    LlmSummarizer<GeminiProvider>,
    DirectorySink,
    SqliteRunLog,
>;

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidInput(format!("Invalid date '{}': {}", value, e)))
}

/// Today's date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Policy named on the command line, or the configured one
pub fn select_policy(config: &Config, preset: Option<&str>) -> Result<CompliancePolicy> {
    match preset {
        Some(name) => CompliancePolicy::preset(name)
            .ok_or_else(|| CliError::InvalidInput(format!("Unknown policy preset: {}", name))),
        None => Ok(config.policy.clone()),
    }
}

/// Rule set from a rule file when one is given, otherwise from the policy
pub fn load_rules(
    config: &Config,
    policy: &CompliancePolicy,
    rules_file: Option<&Path>,
) -> Result<RuleSet> {
    let file = rules_file.or(config.rules_file.as_deref());
    let rules = match file {
        Some(path) => {
            info!("Loading rules from {}", path.display());
            RuleSet::load(RuleSource::File(path.to_path_buf()))?
        }
        None => policy.to_ruleset()?,
    };
    debug!("Loaded {} rules", rules.len());
    Ok(rules)
}

/// Evaluation context for new runs
pub fn build_context(
    policy: &CompliancePolicy,
    as_of: Option<&str>,
    contract_end: Option<&str>,
) -> Result<EvaluationContext> {
    let reference_date = match as_of {
        Some(date) => parse_date(date)?,
        None => today(),
    };
    let mut context = policy.context(reference_date);
    if let Some(date) = contract_end {
        context = context.with_contract_end_date(parse_date(date)?);
    }
    context.validate().map_err(CliError::InvalidInput)?;
    Ok(context)
}

/// Assemble the pipeline
///
/// Gemini is used only when an API key is available. Without one the
/// Summarize step is disabled and extraction must be in `pattern` mode.
pub fn build_pipeline(
    config: &Config,
    model: &ModelArgs,
    rules: RuleSet,
    context: EvaluationContext,
    output: Option<PathBuf>,
) -> Result<CliPipeline> {
    let provider = || -> Result<Option<GeminiProvider>> {
        match &model.api_key {
            Some(key) => Ok(Some(GeminiProvider::new(config.gemini.clone(), key.as_str())?)),
            None => Ok(None),
        }
    };

    let extractor = ConfiguredExtractor::from_config(config.extractor.clone(), provider()?)?;
    let summarizer = if model.no_summary {
        None
    } else {
        provider()?.map(LlmSummarizer::new)
    };

    let mut pipeline_config = config.pipeline.clone();
    if summarizer.is_none() && pipeline_config.summarize_enabled {
        debug!("No summarizer available, disabling Summarize");
        pipeline_config.summarize_enabled = false;
    }
    if let Some(dir) = output {
        pipeline_config.reports.output_dir = dir;
    }

    let sink = DirectorySink::new(pipeline_config.reports.output_dir.clone());
    let log = SqliteRunLog::new(&config.run_log)?;
    info!(
        "Run log at {}, reports to {}",
        config.run_log.display(),
        sink.dir().display()
    );

    let collaborators = Collaborators {
        source: FileSource::new(),
        extractor,
        summarizer,
        sink,
        log,
    };
    Ok(PipelineOrchestrator::new(
        collaborators,
        rules,
        context,
        pipeline_config,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_extractor::{ExtractionMode, ExtractorConfig};
    use tempfile::TempDir;

    fn no_model() -> ModelArgs {
        ModelArgs {
            api_key: None,
            no_summary: false,
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        Config {
            run_log: dir.path().join("runs.db"),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(matches!(parse_date("06/01/2024"), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_select_policy() {
        let config = Config::default();
        assert_eq!(select_policy(&config, None).unwrap(), config.policy);
        assert_eq!(
            select_policy(&config, Some("strict")).unwrap(),
            CompliancePolicy::strict()
        );
        assert!(select_policy(&config, Some("bogus")).is_err());
    }

    #[test]
    fn test_build_context() {
        let policy = CompliancePolicy::default();
        let context = build_context(&policy, Some("2024-01-01"), Some("2024-12-31")).unwrap();
        assert_eq!(context.reference_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(
            context.contract_end_date,
            Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        );
        assert_eq!(context.required_minimums, policy.minimum_coverage);
    }

    #[test]
    fn test_load_rules_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            r#"
[[rules]]
id = "has-policy-number"
severity = "blocking"
field_type = "text"
kind = "presence"
fields = ["policy_number"]
"#,
        )
        .unwrap();

        let config = Config::default();
        let rules = load_rules(&config, &config.policy, Some(&path)).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.get("has-policy-number").is_some());
    }

    #[test]
    fn test_pipeline_without_key_disables_summaries() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let rules = config.policy.to_ruleset().unwrap();
        let context = build_context(&config.policy, Some("2024-01-01"), None).unwrap();

        let pipeline = build_pipeline(
            &config,
            &no_model(),
            rules,
            context,
            Some(dir.path().join("out")),
        )
        .unwrap();
        assert!(!pipeline.config().summarize_enabled);
        assert_eq!(pipeline.config().reports.output_dir, dir.path().join("out"));
    }

    #[test]
    fn test_llm_mode_requires_key() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.extractor = ExtractorConfig {
            mode: ExtractionMode::Llm,
            ..ExtractorConfig::default()
        };
        let rules = config.policy.to_ruleset().unwrap();
        let context = build_context(&config.policy, Some("2024-01-01"), None).unwrap();

        let result = build_pipeline(&config, &no_model(), rules, context, None);
        assert!(matches!(result, Err(CliError::Extractor(_))));
    }
}
