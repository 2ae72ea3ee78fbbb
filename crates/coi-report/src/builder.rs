//! Serialization of compliance results into JSON and CSV reports

use crate::config::{NonScalarPolicy, ReportConfig};
use crate::error::ReportError;
use chrono::{DateTime, SecondsFormat, Utc};
use coi_domain::{
    AggregateStatus, ComplianceResult, DocumentMetadata, Evidence, FieldValue, Outcome,
    ReportFormat, RuleId, Severity, Verdict,
};
use serde::Serialize;
use tracing::debug;

/// Separator used when a list value is written into one CSV cell
pub const LIST_SEPARATOR: char = '|';

/// Cell written for list evidence that cannot be flattened
pub const SEE_JSON: &str = "see JSON";

/// Separator between `name=value` pairs in the evidence cell
const PAIR_SEPARATOR: &str = "; ";

const CSV_HEADER: [&str; 11] = [
    "run_id",
    "document_id",
    "source",
    "generated_at",
    "aggregate_status",
    "rule_id",
    "outcome",
    "severity",
    "evidence",
    "note",
    "error",
];

/// A built report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Format of `body`
    pub format: ReportFormat,
    /// Timestamp written into the report
    pub generated_at: DateTime<Utc>,
    /// Serialized report
    pub body: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    run_id: String,
    document_id: &'a str,
    source: &'a DocumentMetadata,
    generated_at: String,
    aggregate_status: AggregateStatus,
    summary: Option<&'a str>,
    verdicts: Vec<JsonVerdict<'a>>,
}

#[derive(Serialize)]
struct JsonVerdict<'a> {
    rule_id: &'a RuleId,
    outcome: Outcome,
    severity: Severity,
    evidence: &'a Evidence,
}

/// Builds reports from a compliance result and its document's metadata
///
/// Output depends only on the inputs: building the same result twice with
/// the same `generated_at` yields byte-identical bodies.
///
/// # Examples
///
/// ```
/// use coi_report::{ReportBuilder, ReportConfig};
/// use coi_domain::{ComplianceResult, Document, ReportFormat, RunId};
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let document = Document::new("acme.txt", "COI text", at);
/// let result = ComplianceResult::new(RunId::new(), document.id.clone(), vec![]);
///
/// let builder = ReportBuilder::new(ReportConfig::default());
/// let report = builder
///     .build_at(&result, &document.metadata(), None, ReportFormat::Json, at)
///     .unwrap();
/// assert!(report.body.contains("\"aggregate_status\": \"compliant\""));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    config: ReportConfig,
}

impl ReportBuilder {
    /// Create a builder
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build a report stamped with the current time
    pub fn build(
        &self,
        result: &ComplianceResult,
        metadata: &DocumentMetadata,
        format: ReportFormat,
    ) -> Result<Report, ReportError> {
        self.build_at(result, metadata, None, format, Utc::now())
    }

    /// Build a report with an explicit timestamp and optional summary
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] when the result cannot be
    /// written, including CSV list evidence rejected by
    /// [`NonScalarPolicy::Reject`].
    pub fn build_at(
        &self,
        result: &ComplianceResult,
        metadata: &DocumentMetadata,
        summary: Option<&str>,
        format: ReportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, ReportError> {
        let mut verdicts: Vec<&Verdict> = result.verdicts.iter().collect();
        verdicts.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

        let body = match format {
            ReportFormat::Json => self.json(result, metadata, summary, &verdicts, generated_at)?,
            ReportFormat::Csv => self.csv(result, metadata, &verdicts, generated_at)?,
        };
        debug!(
            "Built {} report for run {} ({} verdicts, {} bytes)",
            format.extension(),
            result.run_id,
            verdicts.len(),
            body.len()
        );

        Ok(Report {
            format,
            generated_at,
            body,
        })
    }

    fn json(
        &self,
        result: &ComplianceResult,
        metadata: &DocumentMetadata,
        summary: Option<&str>,
        verdicts: &[&Verdict],
        generated_at: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let report = JsonReport {
            run_id: result.run_id.to_string(),
            document_id: result.document_id.as_str(),
            source: metadata,
            generated_at: timestamp(generated_at),
            aggregate_status: result.status,
            summary,
            verdicts: verdicts
                .iter()
                .map(|v| JsonVerdict {
                    rule_id: &v.rule_id,
                    outcome: v.outcome,
                    severity: v.severity,
                    evidence: &v.evidence,
                })
                .collect(),
        };

        let body = if self.config.pretty_json {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(body)
    }

    fn csv(
        &self,
        result: &ComplianceResult,
        metadata: &DocumentMetadata,
        verdicts: &[&Verdict],
        generated_at: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let mut out = String::new();
        push_row(&mut out, CSV_HEADER.iter().map(|s| s.to_string()));

        let run_id = result.run_id.to_string();
        let generated_at = timestamp(generated_at);
        for verdict in verdicts {
            let evidence = self.evidence_cell(verdict)?;
            push_row(
                &mut out,
                [
                    run_id.clone(),
                    result.document_id.to_string(),
                    metadata.source.clone(),
                    generated_at.clone(),
                    result.status.to_string(),
                    verdict.rule_id.to_string(),
                    verdict.outcome.to_string(),
                    verdict.severity.to_string(),
                    evidence,
                    verdict.evidence.note.clone().unwrap_or_default(),
                    verdict.evidence.error.clone().unwrap_or_default(),
                ],
            );
        }
        Ok(out)
    }

    /// `name=value` pairs joined with `; `; absent fields read `<absent>`
    fn evidence_cell(&self, verdict: &Verdict) -> Result<String, ReportError> {
        let mut parts = Vec::with_capacity(verdict.evidence.values.len());
        for (name, value) in &verdict.evidence.values {
            let rendered = match value {
                None => "<absent>".to_string(),
                Some(FieldValue::List(items)) => match flatten_list(items) {
                    Ok(joined) => joined,
                    Err(reason) => match self.config.non_scalar {
                        NonScalarPolicy::Flatten => SEE_JSON.to_string(),
                        NonScalarPolicy::Reject => {
                            return Err(ReportError::Serialization(format!(
                                "rule {}: list field '{}' {}",
                                verdict.rule_id, name, reason
                            )))
                        }
                    },
                },
                Some(scalar) => scalar.to_string(),
            };
            parts.push(format!("{}={}", name, rendered));
        }
        Ok(parts.join(PAIR_SEPARATOR))
    }
}

/// Join list items with `|`
///
/// Fails with the reason when the joined cell would not read back as the
/// same list: an item holding the list separator, the pair separator or
/// `=`, or an empty item (`[""]` would otherwise look like `[]`).
fn flatten_list(items: &[String]) -> Result<String, String> {
    for item in items {
        if item.is_empty() {
            return Err("has an empty item".to_string());
        }
        if item.contains(LIST_SEPARATOR) {
            return Err(format!("has items containing '{}'", LIST_SEPARATOR));
        }
        if item.contains(PAIR_SEPARATOR) || item.contains('=') {
            return Err(format!(
                "has items containing '{}' or '='",
                PAIR_SEPARATOR.trim_end()
            ));
        }
    }
    Ok(items
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string()))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let row: Vec<String> = cells.into_iter().map(|c| escape_cell(&c)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Quote a cell when it contains a delimiter, quote or line break
fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
