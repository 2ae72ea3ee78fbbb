//! PipelineOrchestrator - runs Ingest → Extract → Evaluate → Summarize → Report

use crate::cancel::CancellationToken;
use crate::config::{PipelineConfig, StepPolicy};
use crate::error::PipelineError;
use chrono::Utc;
use coi_domain::traits::{
    DocumentSource, FieldExtractor, ReportSink, RunLogStore, Summarizer, Transient,
};
use coi_domain::{
    Artifact, ComplianceResult, Document, DocumentId, EvaluationContext, FieldMap, PipelineRun,
    ReportRef, RunArtifacts, RunEvent, RunEventKind, RunId, RunStatus, StepName,
};
use coi_report::ReportBuilder;
use coi_rules::{ComplianceEvaluator, RuleSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Boundary implementations a pipeline runs against
pub struct Collaborators<S, E, M, K, L> {
    /// Fetches raw document text
    pub source: S,
    /// Turns text into fields
    pub extractor: E,
    /// Writes narrative summaries; `None` skips Summarize
    pub summarizer: Option<M>,
    /// Stores built reports
    pub sink: K,
    /// Append-only run log
    pub log: L,
}

/// Outcome of one run within a batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Source the run processed
    pub source: String,
    /// Replayed run, or the infrastructure error that stopped it
    pub result: Result<PipelineRun, PipelineError>,
}

/// A failed attempt, reduced to what the run log records
#[derive(Debug)]
struct StepFailure {
    message: String,
    transient: bool,
}

impl StepFailure {
    fn from_error<E: std::error::Error + Transient>(err: &E) -> Self {
        Self {
            message: err.to_string(),
            transient: err.is_transient(),
        }
    }

    fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }
}

enum StepOutcome<T> {
    Succeeded(T),
    Failed,
    Cancelled,
}

/// Artifacts a run carries from one step to the next
#[derive(Default)]
struct Working {
    document: Option<Document>,
    fields: Option<FieldMap>,
    compliance: Option<ComplianceResult>,
    summary: Option<String>,
}

impl Working {
    /// Artifacts of steps before `from`; later ones are produced again
    fn preserved(artifacts: &RunArtifacts, from: StepName) -> Self {
        let keep = |step: StepName| step < from;
        Self {
            document: artifacts.document.clone().filter(|_| keep(StepName::Ingest)),
            fields: artifacts.fields.clone().filter(|_| keep(StepName::Extract)),
            compliance: artifacts.compliance.clone().filter(|_| keep(StepName::Evaluate)),
            summary: artifacts.summary.clone().filter(|_| keep(StepName::Summarize)),
        }
    }
}

/// Runs certificates through the compliance pipeline
///
/// Every transition is appended to the run log; a run's state is whatever
/// replaying its log yields. Step failures are recorded, never returned:
/// `Err` means the orchestrator itself could not proceed (log I/O, unknown
/// run).
///
/// External calls run on the blocking pool under a per-attempt timeout. An
/// attempt that times out counts as a transient failure; its thread is left
/// to finish in the background.
///
/// # Examples
///
/// ```no_run
/// use coi_pipeline::{Collaborators, FileSource, InMemoryRunLog, PipelineConfig, PipelineOrchestrator};
/// use coi_extractor::{ExtractorConfig, PatternExtractor};
/// use coi_llm::{LlmSummarizer, MockProvider};
/// use coi_report::DirectorySink;
/// use coi_rules::CompliancePolicy;
/// use chrono::NaiveDate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = CompliancePolicy::default();
/// let pipeline = PipelineOrchestrator::new(
///     Collaborators {
///         source: FileSource::new(),
///         extractor: PatternExtractor::new(ExtractorConfig::default())?,
///         summarizer: None::<LlmSummarizer<MockProvider>>,
///         sink: DirectorySink::new("reports"),
///         log: InMemoryRunLog::new(),
///     },
///     policy.to_ruleset()?,
///     policy.context(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
///     PipelineConfig::default(),
/// )?;
///
/// let run = pipeline.run("inbox/acme.txt").await?;
/// println!("{} finished {}", run.run_id, run.status);
/// # Ok(())
/// # }
/// ```
pub struct PipelineOrchestrator<S, E, M, K, L> {
    source: Arc<S>,
    extractor: Arc<E>,
    summarizer: Option<Arc<M>>,
    sink: Arc<K>,
    log: L,
    rules: Arc<RuleSet>,
    evaluator: ComplianceEvaluator,
    reports: Arc<ReportBuilder>,
    context: EvaluationContext,
    config: PipelineConfig,
}

impl<S, E, M, K, L> PipelineOrchestrator<S, E, M, K, L>
where
    S: DocumentSource + Send + Sync + 'static,
    E: FieldExtractor + Send + Sync + 'static,
    M: Summarizer + Send + Sync + 'static,
    K: ReportSink + Send + Sync + 'static,
    L: RunLogStore + Send + Sync + 'static,
{
    /// Create an orchestrator
    ///
    /// `context` is recorded with every new run; resumed runs keep the
    /// context they started with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when `config` fails validation.
    pub fn new(
        collaborators: Collaborators<S, E, M, K, L>,
        rules: RuleSet,
        context: EvaluationContext,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::InvalidConfig)?;

        Ok(Self {
            source: Arc::new(collaborators.source),
            extractor: Arc::new(collaborators.extractor),
            summarizer: collaborators.summarizer.map(Arc::new),
            sink: Arc::new(collaborators.sink),
            log: collaborators.log,
            rules: Arc::new(rules),
            evaluator: ComplianceEvaluator::new(),
            reports: Arc::new(ReportBuilder::new(config.reports.clone())),
            context,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Context recorded with new runs
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// The run log
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Where reports are stored
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run one document under a fresh run id
    pub async fn run(&self, source: &str) -> Result<PipelineRun, PipelineError> {
        self.run_with_id(RunId::new(), source, &CancellationToken::new())
            .await
    }

    /// Run one document under the given run id
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateRun`] when the log already holds
    /// events for `run_id`, and [`PipelineError::RunLog`] when appending fails.
    /// Of concurrent calls sharing one id, exactly one proceeds.
    pub async fn run_with_id(
        &self,
        run_id: RunId,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineError> {
        let started = self
            .log
            .start(
                run_id,
                RunEventKind::RunStarted {
                    document_id: DocumentId::new(source),
                    source: source.to_string(),
                    context: self.context.clone(),
                },
            )
            .map_err(|e| PipelineError::RunLog(e.to_string()))?;
        if started.is_none() {
            return Err(PipelineError::DuplicateRun(run_id));
        }
        info!("Starting run {} for {}", run_id, source);

        self.execute(run_id, source, &self.context, Working::default(), StepName::Ingest, cancel)
            .await?;
        self.load_run(run_id)
    }

    /// Continue a run from its first step that did not succeed
    ///
    /// Artifacts of earlier steps are reused from the log. A run that
    /// already succeeded is returned unchanged.
    pub async fn resume(
        &self,
        run_id: RunId,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, PipelineError> {
        let run = self.load_run(run_id)?;
        let Some(from) = run.resume_point() else {
            info!("Run {} has nothing to resume ({})", run_id, run.status);
            return Ok(run);
        };

        info!("Resuming run {} from {} (was {})", run_id, from, run.status);
        self.append(run_id, RunEventKind::RunResumed { from })?;

        let work = Working::preserved(&run.artifacts, from);
        self.execute(run_id, &run.source, &run.context, work, from, cancel)
            .await?;
        self.load_run(run_id)
    }

    /// Run many documents as independent runs
    ///
    /// At most `max_concurrent_runs` run at once. Outcomes are returned in
    /// the order of `sources`.
    pub async fn run_batch(
        self: &Arc<Self>,
        sources: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_runs));
        let mut tasks = JoinSet::new();

        info!(
            "Starting batch of {} documents ({} at a time)",
            sources.len(),
            self.config.max_concurrent_runs
        );

        for (index, source) in sources.iter().cloned().enumerate() {
            let pipeline = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        pipeline
                            .run_with_id(RunId::new(), &source, &cancel)
                            .await
                    }
                    Err(e) => Err(PipelineError::Join(e.to_string())),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<PipelineRun, PipelineError>>> =
            sources.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => error!("Batch task failed: {}", e),
            }
        }

        sources
            .into_iter()
            .zip(results)
            .map(|(source, result)| BatchOutcome {
                source,
                result: result.unwrap_or_else(|| {
                    Err(PipelineError::Join("run task did not complete".to_string()))
                }),
            })
            .collect()
    }

    /// Replay a run from the log
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownRun`] when the log has no usable
    /// events for `run_id`.
    pub fn load_run(&self, run_id: RunId) -> Result<PipelineRun, PipelineError> {
        let events = self.events(run_id)?;
        PipelineRun::replay(&events).ok_or(PipelineError::UnknownRun(run_id))
    }

    /// Replay every run in the log, oldest first
    pub fn list_runs(&self) -> Result<Vec<PipelineRun>, PipelineError> {
        let ids = self
            .log
            .run_ids()
            .map_err(|e| PipelineError::RunLog(e.to_string()))?;
        ids.into_iter().map(|id| self.load_run(id)).collect()
    }

    async fn execute(
        &self,
        run_id: RunId,
        source: &str,
        context: &EvaluationContext,
        mut work: Working,
        from: StepName,
        cancel: &CancellationToken,
    ) -> Result<RunStatus, PipelineError> {
        let mut blocked_by: Option<StepName> = None;
        let mut cancelled = false;
        let mut summary_failed = false;

        for step in StepName::ALL.into_iter().skip(from.index()) {
            if let Some(failed) = blocked_by {
                self.skip(run_id, step, format!("{} failed", failed))?;
                continue;
            }
            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                self.skip(run_id, step, "cancelled".to_string())?;
                continue;
            }
            if step == StepName::Summarize
                && (!self.config.summarize_enabled || self.summarizer.is_none())
            {
                self.skip(run_id, step, "summarization disabled".to_string())?;
                continue;
            }

            let outcome = match step {
                StepName::Ingest => self.ingest(run_id, source, &mut work, cancel).await?,
                StepName::Extract => self.extract(run_id, &mut work, cancel).await?,
                StepName::Evaluate => self.evaluate(run_id, context, &mut work, cancel).await?,
                StepName::Summarize => self.summarize(run_id, &mut work, cancel).await?,
                StepName::Report => self.report(run_id, &work, cancel).await?,
            };

            match outcome {
                StepOutcome::Succeeded(()) => {
                    self.append(run_id, RunEventKind::StepSucceeded { step })?;
                }
                StepOutcome::Failed if step.is_mandatory() => blocked_by = Some(step),
                StepOutcome::Failed => summary_failed = true,
                StepOutcome::Cancelled => cancelled = true,
            }
        }

        let status = if cancelled {
            RunStatus::Cancelled
        } else if blocked_by.is_some() {
            RunStatus::Failed
        } else if summary_failed {
            RunStatus::SucceededWithWarnings
        } else {
            RunStatus::Succeeded
        };

        self.append(run_id, RunEventKind::RunFinished { status })?;
        match status {
            RunStatus::Failed => error!("Run {} failed", run_id),
            RunStatus::SucceededWithWarnings | RunStatus::Cancelled => {
                warn!("Run {} finished {}", run_id, status)
            }
            _ => info!("Run {} finished {}", run_id, status),
        }
        Ok(status)
    }

    async fn ingest(
        &self,
        run_id: RunId,
        source: &str,
        work: &mut Working,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let fetcher = Arc::clone(&self.source);
        let location = source.to_string();
        let outcome = self
            .attempt(run_id, StepName::Ingest, self.config.ingest, cancel, move || {
                fetcher
                    .fetch(&location)
                    .map_err(|e| StepFailure::from_error(&e))
            })
            .await?;

        match outcome {
            StepOutcome::Succeeded(text) => {
                let document = Document::new(source, text, Utc::now());
                debug!("Ingested {} ({})", document.id, document.content_hash);
                self.record(run_id, Artifact::Document(document.clone()))?;
                work.document = Some(document);
                Ok(StepOutcome::Succeeded(()))
            }
            StepOutcome::Failed => Ok(StepOutcome::Failed),
            StepOutcome::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    async fn extract(
        &self,
        run_id: RunId,
        work: &mut Working,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let Some(document) = work.document.as_ref() else {
            return self.missing(run_id, StepName::Extract, "document");
        };

        let extractor = Arc::clone(&self.extractor);
        let text = document.raw_text.clone();
        let outcome = self
            .attempt(run_id, StepName::Extract, self.config.extract, cancel, move || {
                extractor
                    .extract(&text)
                    .map_err(|e| StepFailure::from_error(&e))
            })
            .await?;

        match outcome {
            StepOutcome::Succeeded(fields) => {
                debug!("Extracted {} fields for run {}", fields.len(), run_id);
                self.record(run_id, Artifact::Fields(fields.clone()))?;
                work.fields = Some(fields);
                Ok(StepOutcome::Succeeded(()))
            }
            StepOutcome::Failed => Ok(StepOutcome::Failed),
            StepOutcome::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    async fn evaluate(
        &self,
        run_id: RunId,
        context: &EvaluationContext,
        work: &mut Working,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let (Some(document), Some(fields)) = (work.document.as_ref(), work.fields.clone()) else {
            return self.missing(run_id, StepName::Evaluate, "document or fields");
        };

        let evaluator = self.evaluator;
        let rules = Arc::clone(&self.rules);
        let document_id = document.id.clone();
        let context = context.clone();
        let once = StepPolicy::new(1, self.config.evaluate_timeout_ms);
        let outcome = self
            .attempt(run_id, StepName::Evaluate, once, cancel, move || {
                evaluator
                    .evaluate(run_id, document_id.clone(), &fields, &rules, &context)
                    .map_err(|e| StepFailure::permanent(e.to_string()))
            })
            .await?;

        match outcome {
            StepOutcome::Succeeded(result) => {
                if let Ok(fingerprint) = result.fingerprint() {
                    info!(
                        "Run {} evaluated {} ({} verdicts, fingerprint {})",
                        run_id,
                        result.status,
                        result.verdicts.len(),
                        fingerprint
                    );
                }
                self.record(run_id, Artifact::Compliance(result.clone()))?;
                work.compliance = Some(result);
                Ok(StepOutcome::Succeeded(()))
            }
            StepOutcome::Failed => Ok(StepOutcome::Failed),
            StepOutcome::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    async fn summarize(
        &self,
        run_id: RunId,
        work: &mut Working,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let (Some(summarizer), Some(document), Some(result)) = (
            self.summarizer.as_ref(),
            work.document.as_ref(),
            work.compliance.clone(),
        ) else {
            return self.missing(run_id, StepName::Summarize, "document or compliance result");
        };

        let summarizer = Arc::clone(summarizer);
        let text = document.raw_text.clone();
        let outcome = self
            .attempt(run_id, StepName::Summarize, self.config.summarize, cancel, move || {
                summarizer
                    .summarize(&text, &result)
                    .map_err(|e| StepFailure::from_error(&e))
            })
            .await?;

        match outcome {
            StepOutcome::Succeeded(summary) => {
                self.record(run_id, Artifact::Summary(summary.clone()))?;
                work.summary = Some(summary);
                Ok(StepOutcome::Succeeded(()))
            }
            StepOutcome::Failed => Ok(StepOutcome::Failed),
            StepOutcome::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    async fn report(
        &self,
        run_id: RunId,
        work: &Working,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let (Some(document), Some(result)) = (work.document.as_ref(), work.compliance.clone()) else {
            return self.missing(run_id, StepName::Report, "document or compliance result");
        };

        let builder = Arc::clone(&self.reports);
        let sink = Arc::clone(&self.sink);
        let metadata = document.metadata();
        let summary = work.summary.clone();
        let formats = self.config.reports.formats.clone();
        let generated_at = Utc::now();
        let outcome = self
            .attempt(run_id, StepName::Report, self.config.report, cancel, move || {
                // every format must build before any is stored
                let reports = formats
                    .iter()
                    .map(|&format| {
                        builder.build_at(&result, &metadata, summary.as_deref(), format, generated_at)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StepFailure::from_error(&e))?;

                let mut stored = Vec::with_capacity(reports.len());
                for report in reports {
                    let format = report.format;
                    let location = sink
                        .store(run_id, format, &report.body)
                        .map_err(|e| StepFailure::from_error(&e))?;
                    stored.push(ReportRef {
                        format,
                        location,
                        generated_at,
                    });
                }
                Ok(stored)
            })
            .await?;

        match outcome {
            StepOutcome::Succeeded(stored) => {
                for report in stored {
                    info!("Run {} stored {} report at {}", run_id, report.format, report.location);
                    self.record(run_id, Artifact::Report(report))?;
                }
                Ok(StepOutcome::Succeeded(()))
            }
            StepOutcome::Failed => Ok(StepOutcome::Failed),
            StepOutcome::Cancelled => Ok(StepOutcome::Cancelled),
        }
    }

    /// Execute `work` under the step's retry policy, logging every attempt
    async fn attempt<T, F>(
        &self,
        run_id: RunId,
        step: StepName,
        policy: StepPolicy,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<StepOutcome<T>, PipelineError>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, StepFailure> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let mut attempt = 1;

        loop {
            self.append(run_id, RunEventKind::StepStarted { step, attempt })?;
            debug!("Run {} step {} attempt {}/{}", run_id, step, attempt, policy.max_attempts);

            let job = Arc::clone(&work);
            let timeout = policy.timeout();
            let result =
                match tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || (*job)())).await
                {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => Err(StepFailure::permanent(format!("{} task failed: {}", step, e))),
                    Err(_) => Err(StepFailure::transient(format!(
                        "{} timed out after {:?}",
                        step, timeout
                    ))),
                };

            let failure = match result {
                Ok(value) => return Ok(StepOutcome::Succeeded(value)),
                Err(failure) => failure,
            };

            self.append(
                run_id,
                RunEventKind::StepAttemptFailed {
                    step,
                    attempt,
                    error: failure.message.clone(),
                    transient: failure.transient,
                },
            )?;

            if !failure.transient || attempt >= policy.max_attempts {
                error!(
                    "Run {} step {} failed after {} attempt(s): {}",
                    run_id, step, attempt, failure.message
                );
                self.append(
                    run_id,
                    RunEventKind::StepFailed {
                        step,
                        error: failure.message,
                    },
                )?;
                return Ok(StepOutcome::Failed);
            }

            let delay = self.config.backoff.delay(attempt);
            warn!(
                "Run {} step {} attempt {}/{} failed: {}. Retrying in {:?}",
                run_id, step, attempt, policy.max_attempts, failure.message, delay
            );
            tokio::time::sleep(delay).await;

            if cancel.is_cancelled() {
                warn!("Run {} cancelled before retrying {}", run_id, step);
                self.append(
                    run_id,
                    RunEventKind::StepFailed {
                        step,
                        error: format!("{} (cancelled before retry)", failure.message),
                    },
                )?;
                return Ok(StepOutcome::Cancelled);
            }
            attempt += 1;
        }
    }

    /// Fail a step whose input artifact is not in the run
    fn missing(
        &self,
        run_id: RunId,
        step: StepName,
        what: &str,
    ) -> Result<StepOutcome<()>, PipelineError> {
        let error = format!("no {} recorded for this run", what);
        error!("Run {} step {}: {}", run_id, step, error);
        self.append(run_id, RunEventKind::StepStarted { step, attempt: 1 })?;
        self.append(
            run_id,
            RunEventKind::StepAttemptFailed {
                step,
                attempt: 1,
                error: error.clone(),
                transient: false,
            },
        )?;
        self.append(run_id, RunEventKind::StepFailed { step, error })?;
        Ok(StepOutcome::Failed)
    }

    fn skip(&self, run_id: RunId, step: StepName, reason: String) -> Result<(), PipelineError> {
        debug!("Run {} skipping {}: {}", run_id, step, reason);
        self.append(run_id, RunEventKind::StepSkipped { step, reason })
    }

    fn record(&self, run_id: RunId, artifact: Artifact) -> Result<(), PipelineError> {
        self.append(run_id, RunEventKind::ArtifactRecorded { artifact })
    }

    fn append(&self, run_id: RunId, kind: RunEventKind) -> Result<(), PipelineError> {
        self.log
            .append(run_id, kind)
            .map(|_| ())
            .map_err(|e| PipelineError::RunLog(e.to_string()))
    }

    fn events(&self, run_id: RunId) -> Result<Vec<RunEvent>, PipelineError> {
        self.log
            .events(run_id)
            .map_err(|e| PipelineError::RunLog(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_domain::FieldValue;

    #[test]
    fn test_preserved_keeps_only_earlier_artifacts() {
        let artifacts = RunArtifacts {
            document: Some(Document::new("acme.txt", "COI", Utc::now())),
            fields: Some(FieldMap::new().with("policy_number", FieldValue::text("GL-1"))),
            compliance: None,
            summary: Some("stale".to_string()),
            reports: vec![],
        };

        let work = Working::preserved(&artifacts, StepName::Extract);
        assert!(work.document.is_some());
        assert!(work.fields.is_none());
        assert!(work.summary.is_none());

        let work = Working::preserved(&artifacts, StepName::Report);
        assert!(work.fields.is_some());
        assert_eq!(work.summary.as_deref(), Some("stale"));
    }

    #[test]
    fn test_step_failure_keeps_classification() {
        #[derive(Debug, thiserror::Error)]
        #[error("flaky")]
        struct Flaky;
        impl Transient for Flaky {
            fn is_transient(&self) -> bool {
                true
            }
        }

        let failure = StepFailure::from_error(&Flaky);
        assert!(failure.transient);
        assert_eq!(failure.message, "flaky");
        assert!(!StepFailure::permanent("bad").transient);
    }
}
