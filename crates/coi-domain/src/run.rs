//! Run module - pipeline run events and the state replayed from them
//!
//! A run is never stored as a mutable record. The orchestrator appends
//! [`RunEvent`]s to a log; [`PipelineRun::replay`] folds them into the
//! current view. Artifacts travel inside `ArtifactRecorded` events so a
//! failed run can be resumed from its log alone.

use crate::context::EvaluationContext;
use crate::document::{Document, DocumentId};
use crate::field::FieldMap;
use crate::verdict::ComplianceResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pipeline run based on UUIDv7
///
/// UUIDv7 ids sort by creation time, so listing runs in id order lists them
/// chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a new run id
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::RunId;
    ///
    /// let id = RunId::new();
    /// let parsed = RunId::parse(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a run id from its string form
    pub fn parse(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid run id '{}': {}", s, e))
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    /// Fetch the raw text
    Ingest,
    /// Turn text into a FieldMap
    Extract,
    /// Apply the RuleSet
    Evaluate,
    /// Optional narrative summary
    Summarize,
    /// Build and store reports
    Report,
}

impl StepName {
    /// Every step, in execution order
    pub const ALL: [StepName; 5] = [
        StepName::Ingest,
        StepName::Extract,
        StepName::Evaluate,
        StepName::Summarize,
        StepName::Report,
    ];

    /// Whether a failure of this step fails the run
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, StepName::Summarize)
    }

    /// Position of the step in execution order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get the step name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Ingest => "ingest",
            StepName::Extract => "extract",
            StepName::Evaluate => "evaluate",
            StepName::Summarize => "summarize",
            StepName::Report => "report",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started
    Pending,
    /// Started, not finished
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
    /// Not executed
    Skipped,
}

impl StepStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    /// Succeeded, failed or skipped
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replayed state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step
    pub name: StepName,
    /// Current status
    pub status: StepStatus,
    /// Start of the first attempt
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal status
    pub ended_at: Option<DateTime<Utc>>,
    /// Attempts made so far
    pub attempts: u32,
    /// Last error, if any attempt failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why the step was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepRecord {
    fn pending(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            attempts: 0,
            error: None,
            note: None,
        }
    }
}

/// Final (or current) status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Started and not finished
    Running,
    /// Every mandatory step succeeded and Summarize did not fail
    Succeeded,
    /// Mandatory steps succeeded but Summarize failed
    SucceededWithWarnings,
    /// A mandatory step failed
    Failed,
    /// Stopped at a step boundary on request
    Cancelled,
}

impl RunStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::SucceededWithWarnings => "succeeded_with_warnings",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the run has finished
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialization format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One JSON document
    Json,
    /// One row per verdict
    Csv,
}

impl ReportFormat {
    /// File extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }

    /// Parse a format name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where a stored report can be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRef {
    /// Report format
    pub format: ReportFormat,
    /// Path or URI returned by the sink
    pub location: String,
    /// Timestamp written into the report
    pub generated_at: DateTime<Utc>,
}

/// A value produced by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "artifact", content = "data", rename_all = "snake_case")]
pub enum Artifact {
    /// Produced by Ingest
    Document(Document),
    /// Produced by Extract
    Fields(FieldMap),
    /// Produced by Evaluate
    Compliance(ComplianceResult),
    /// Produced by Summarize
    Summary(String),
    /// Produced by Report, one per format
    Report(ReportRef),
}

impl Artifact {
    /// Step that produces this kind of artifact
    pub fn step(&self) -> StepName {
        match self {
            Artifact::Document(_) => StepName::Ingest,
            Artifact::Fields(_) => StepName::Extract,
            Artifact::Compliance(_) => StepName::Evaluate,
            Artifact::Summary(_) => StepName::Summarize,
            Artifact::Report(_) => StepName::Report,
        }
    }
}

/// Artifacts recorded against a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifacts {
    /// Ingested document
    pub document: Option<Document>,
    /// Extracted fields
    pub fields: Option<FieldMap>,
    /// Evaluation result
    pub compliance: Option<ComplianceResult>,
    /// Narrative summary
    pub summary: Option<String>,
    /// Stored reports
    pub reports: Vec<ReportRef>,
}

impl RunArtifacts {
    fn record(&mut self, artifact: &Artifact) {
        match artifact {
            Artifact::Document(d) => self.document = Some(d.clone()),
            Artifact::Fields(f) => self.fields = Some(f.clone()),
            Artifact::Compliance(c) => self.compliance = Some(c.clone()),
            Artifact::Summary(s) => self.summary = Some(s.clone()),
            Artifact::Report(r) => self.reports.push(r.clone()),
        }
    }

    fn clear(&mut self, step: StepName) {
        match step {
            StepName::Ingest => self.document = None,
            StepName::Extract => self.fields = None,
            StepName::Evaluate => self.compliance = None,
            StepName::Summarize => self.summary = None,
            StepName::Report => self.reports.clear(),
        }
    }
}

/// What happened in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    /// First event of every run
    RunStarted {
        /// Document being processed
        document_id: DocumentId,
        /// Source passed to the run
        source: String,
        /// Context the run evaluates under; reused on resume
        context: EvaluationContext,
    },
    /// A finished run was reopened
    RunResumed {
        /// First step to re-execute
        from: StepName,
    },
    /// A step attempt began
    StepStarted {
        /// Step
        step: StepName,
        /// Attempt number, starting at 1
        attempt: u32,
    },
    /// An attempt failed; another attempt may follow
    StepAttemptFailed {
        /// Step
        step: StepName,
        /// Attempt number
        attempt: u32,
        /// Error message
        error: String,
        /// Whether the failure was classified transient
        transient: bool,
    },
    /// The step succeeded
    StepSucceeded {
        /// Step
        step: StepName,
    },
    /// The step failed for good
    StepFailed {
        /// Step
        step: StepName,
        /// Error message of the last attempt
        error: String,
    },
    /// The step was not executed
    StepSkipped {
        /// Step
        step: StepName,
        /// Why it was skipped
        reason: String,
    },
    /// A step produced an artifact
    ArtifactRecorded {
        /// The artifact
        artifact: Artifact,
    },
    /// Last event of a run (until resumed)
    RunFinished {
        /// Final status
        status: RunStatus,
    },
}

/// An entry of the append-only run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Run the event belongs to
    pub run_id: RunId,
    /// Position in the run's log, starting at 0
    pub seq: u64,
    /// When the event was appended
    pub recorded_at: DateTime<Utc>,
    /// What happened
    pub kind: RunEventKind,
}

/// Replayed view of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Run id
    pub run_id: RunId,
    /// Document being processed
    pub document_id: DocumentId,
    /// Source passed to the run
    pub source: String,
    /// Context recorded at start
    pub context: EvaluationContext,
    /// One record per step, in execution order
    pub steps: Vec<StepRecord>,
    /// Current status
    pub status: RunStatus,
    /// Recorded artifacts
    pub artifacts: RunArtifacts,
    /// Timestamp of RunStarted
    pub started_at: DateTime<Utc>,
    /// Timestamp of the last RunFinished
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Fold a run's events into its current state
    ///
    /// Returns `None` when the log is empty or does not open with
    /// `RunStarted`.
    pub fn replay(events: &[RunEvent]) -> Option<Self> {
        let (first, rest) = events.split_first()?;
        let RunEventKind::RunStarted {
            document_id,
            source,
            context,
        } = &first.kind
        else {
            return None;
        };

        let mut run = PipelineRun {
            run_id: first.run_id,
            document_id: document_id.clone(),
            source: source.clone(),
            context: context.clone(),
            steps: StepName::ALL.iter().copied().map(StepRecord::pending).collect(),
            status: RunStatus::Running,
            artifacts: RunArtifacts::default(),
            started_at: first.recorded_at,
            finished_at: None,
        };

        for event in rest {
            run.apply(event);
        }
        Some(run)
    }

    fn apply(&mut self, event: &RunEvent) {
        let at = event.recorded_at;
        match &event.kind {
            RunEventKind::RunStarted { .. } => {}
            RunEventKind::RunResumed { from } => {
                for record in self.steps.iter_mut().skip(from.index()) {
                    *record = StepRecord::pending(record.name);
                    self.artifacts.clear(record.name);
                }
                self.status = RunStatus::Running;
                self.finished_at = None;
            }
            RunEventKind::StepStarted { step, attempt } => {
                self.artifacts.clear(*step);
                let record = &mut self.steps[step.index()];
                record.status = StepStatus::Running;
                if *attempt <= 1 || record.started_at.is_none() {
                    record.started_at = Some(at);
                }
                record.ended_at = None;
                record.attempts = *attempt;
                record.note = None;
            }
            RunEventKind::StepAttemptFailed { step, error, .. } => {
                self.steps[step.index()].error = Some(error.clone());
            }
            RunEventKind::StepSucceeded { step } => {
                let record = &mut self.steps[step.index()];
                record.status = StepStatus::Succeeded;
                record.ended_at = Some(at);
                record.error = None;
            }
            RunEventKind::StepFailed { step, error } => {
                let record = &mut self.steps[step.index()];
                record.status = StepStatus::Failed;
                record.ended_at = Some(at);
                record.error = Some(error.clone());
            }
            RunEventKind::StepSkipped { step, reason } => {
                let record = &mut self.steps[step.index()];
                record.status = StepStatus::Skipped;
                record.ended_at = Some(at);
                record.note = Some(reason.clone());
            }
            RunEventKind::ArtifactRecorded { artifact } => self.artifacts.record(artifact),
            RunEventKind::RunFinished { status } => {
                self.status = *status;
                self.finished_at = Some(at);
            }
        }
    }

    /// Record of a step
    pub fn step(&self, name: StepName) -> &StepRecord {
        &self.steps[name.index()]
    }

    /// First step a resume would re-execute, `None` when nothing is left to do
    ///
    /// A succeeded run has nothing to resume. Otherwise the resume point is
    /// the first step that did not succeed, which for a
    /// `succeeded_with_warnings` run is Summarize.
    pub fn resume_point(&self) -> Option<StepName> {
        if self.status == RunStatus::Succeeded {
            return None;
        }
        self.steps
            .iter()
            .find(|s| s.status != StepStatus::Succeeded)
            .map(|s| s.name)
    }

    /// Audit shape of the run
    pub fn record(&self) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            document_id: self.document_id.clone(),
            steps: self.steps.clone(),
            final_status: self.status,
        }
    }
}

/// Run record as exported for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run id
    pub run_id: RunId,
    /// Processed document
    pub document_id: DocumentId,
    /// Step records in execution order
    pub steps: Vec<StepRecord>,
    /// Final status
    pub final_status: RunStatus,
}
