//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use chrono::SecondsFormat;
use coi_domain::{
    AggregateStatus, ComplianceResult, Outcome, PipelineRun, RunEvent, RunStatus, StepStatus,
};
use coi_rules::RuleSet;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Output format in use.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format one run with its steps and verdicts.
    pub fn format_run(&self, run: &PipelineRun) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&run_json(run))?),
            OutputFormat::Quiet => Ok(run.run_id.to_string()),
            OutputFormat::Table => Ok(self.run_table(run)),
        }
    }

    /// Format a list of runs.
    pub fn format_runs(&self, runs: &[PipelineRun]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let records: Vec<serde_json::Value> = runs.iter().map(run_json).collect();
                Ok(serde_json::to_string_pretty(&records)?)
            }
            OutputFormat::Quiet => Ok(runs
                .iter()
                .map(|r| r.run_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if runs.is_empty() {
                    return Ok(self.colorize("No runs found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Run ID", "Document", "Status", "Compliance", "Started"]);
                for run in runs {
                    builder.push_record([
                        run.run_id.to_string(),
                        run.document_id.to_string(),
                        self.run_status(run.status),
                        self.compliance_status(run.artifacts.compliance.as_ref()),
                        run.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ]);
                }
                Ok(self.finish(builder))
            }
        }
    }

    /// Format the rules of a rule set.
    pub fn format_rules(&self, rules: &RuleSet) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rules: Vec<_> = rules.iter().collect();
                Ok(serde_json::to_string_pretty(&rules)?)
            }
            OutputFormat::Quiet => Ok(rules
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["ID", "Severity", "Kind", "Fields", "Description"]);
                for rule in rules.iter() {
                    builder.push_record([
                        rule.id.to_string(),
                        rule.severity.to_string(),
                        rule.predicate.kind_name().to_string(),
                        rule.predicate.target_fields().join(", "),
                        rule.description.clone(),
                    ]);
                }
                Ok(self.finish(builder))
            }
        }
    }

    /// Format a run's raw event log.
    pub fn format_events(&self, events: &[RunEvent]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(events)?),
            OutputFormat::Quiet => Ok(events
                .iter()
                .map(|e| e.seq.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Seq", "Recorded", "Event"]);
                for event in events {
                    let mut kind = serde_json::to_value(&event.kind)?;
                    // artifacts are large; show only which one was recorded
                    if let Some(artifact) = kind.get_mut("artifact") {
                        if let Some(name) = artifact.get("artifact").cloned() {
                            *artifact = name;
                        }
                    }
                    builder.push_record([
                        event.seq.to_string(),
                        event.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                        kind.to_string(),
                    ]);
                }
                Ok(self.finish(builder))
            }
        }
    }

    fn run_table(&self, run: &PipelineRun) -> String {
        let mut out = format!(
            "Run {} ({}) - {}\n",
            run.run_id,
            run.document_id,
            self.run_status(run.status)
        );

        let mut steps = Builder::default();
        steps.push_record(["Step", "Status", "Attempts", "Started", "Ended", "Detail"]);
        for step in &run.steps {
            let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
                t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_default()
            };
            steps.push_record([
                step.name.to_string(),
                self.step_status(step.status),
                step.attempts.to_string(),
                time(step.started_at),
                time(step.ended_at),
                step.error.clone().or_else(|| step.note.clone()).unwrap_or_default(),
            ]);
        }
        out.push_str(&self.finish(steps));

        if let Some(result) = &run.artifacts.compliance {
            out.push_str(&format!("\n\nCompliance: {}\n", self.compliance_status(Some(result))));
            out.push_str(&self.verdict_table(result));
        }
        if let Some(summary) = &run.artifacts.summary {
            out.push_str(&format!("\n\nSummary:\n{}", summary));
        }
        for report in &run.artifacts.reports {
            out.push_str(&format!("\n{} report: {}", report.format, report.location));
        }
        out
    }

    fn verdict_table(&self, result: &ComplianceResult) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Rule", "Severity", "Outcome", "Detail"]);
        for verdict in &result.verdicts {
            let outcome = match verdict.outcome {
                Outcome::Pass => self.colorize(verdict.outcome.as_str(), "green"),
                Outcome::Fail => self.colorize(verdict.outcome.as_str(), "red"),
                Outcome::Inapplicable => self.colorize(verdict.outcome.as_str(), "yellow"),
            };
            let detail = verdict
                .evidence
                .error
                .clone()
                .or_else(|| verdict.evidence.note.clone())
                .unwrap_or_default();
            builder.push_record([
                verdict.rule_id.to_string(),
                verdict.severity.to_string(),
                outcome,
                detail,
            ]);
        }
        self.finish(builder)
    }

    fn finish(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn run_status(&self, status: RunStatus) -> String {
        let color = match status {
            RunStatus::Succeeded => "green",
            RunStatus::SucceededWithWarnings | RunStatus::Cancelled => "yellow",
            RunStatus::Failed => "red",
            RunStatus::Running => "blue",
        };
        self.colorize(status.as_str(), color)
    }

    fn step_status(&self, status: StepStatus) -> String {
        let color = match status {
            StepStatus::Succeeded => "green",
            StepStatus::Failed => "red",
            StepStatus::Skipped => "yellow",
            StepStatus::Pending | StepStatus::Running => "blue",
        };
        self.colorize(status.as_str(), color)
    }

    fn compliance_status(&self, result: Option<&ComplianceResult>) -> String {
        match result.map(|r| r.status) {
            Some(AggregateStatus::Compliant) => self.colorize("compliant", "green"),
            Some(AggregateStatus::NonCompliant) => self.colorize("non_compliant", "red"),
            Some(AggregateStatus::Indeterminate) => self.colorize("indeterminate", "yellow"),
            None => "-".to_string(),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// One-line outcome of a run, for batch output
    pub fn run_line(&self, source: &str, run: &PipelineRun) -> String {
        let line = format!(
            "{} {} run {} ({})",
            source,
            run.status,
            run.run_id,
            self.compliance_status(run.artifacts.compliance.as_ref())
        );
        match run.status {
            RunStatus::Succeeded => self.success(&line),
            RunStatus::Failed => self.error(&line),
            _ => self.warning(&line),
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// JSON view of a run: the audit record plus its outcome
fn run_json(run: &PipelineRun) -> serde_json::Value {
    serde_json::json!({
        "run": run.record(),
        "source": run.source,
        "aggregate_status": run.artifacts.compliance.as_ref().map(|r| r.status),
        "verdicts": run.artifacts.compliance.as_ref().map(|r| &r.verdicts),
        "summary": run.artifacts.summary,
        "reports": run.artifacts.reports,
    })
}
