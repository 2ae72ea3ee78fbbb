//! End-to-end pipeline runs over files, mock models and real run logs

use chrono::NaiveDate;
use coi_domain::traits::{DocumentSource, ReportSink, RunLogStore};
use coi_domain::{
    AggregateStatus, EvaluationContext, Money, ReportFormat, RunEventKind, RunId, RunStatus,
    StepName, StepStatus,
};
use coi_extractor::{ExtractorConfig, LlmFieldExtractor};
use coi_llm::{LlmError, LlmSummarizer, MockProvider};
use coi_pipeline::{
    BackoffConfig, CancellationToken, Collaborators, FileSource, InMemoryRunLog, PipelineConfig,
    PipelineError, PipelineOrchestrator, SourceError, StepPolicy,
};
use coi_report::{DirectorySink, NonScalarPolicy, ReportError};
use coi_rules::CompliancePolicy;
use coi_store::SqliteRunLog;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CERTIFICATE: &str = "\
CERTIFICATE OF LIABILITY INSURANCE
Insurer A: Travelers Property Casualty Company
Named Insured: Beta Roofing Inc
Policy Number: CGL-88120
Policy Period: 06/01/2024 to 06/01/2025
GENERAL LIABILITY  $1,000,000 / $2,000,000
PROFESSIONAL LIABILITY $1,000,000
WORKERS COMPENSATION $1,000,000
Certificate Holder: Riverside Property Group
Cancellation: 30 days written notice
";

type Pipeline<S, L> = PipelineOrchestrator<
    S,
    LlmFieldExtractor<MockProvider>,
    LlmSummarizer<MockProvider>,
    DirectorySink,
    L,
>;

/// Source that requests cancellation as soon as it has been read
struct CancellingSource {
    inner: FileSource,
    token: CancellationToken,
}

impl DocumentSource for CancellingSource {
    type Error = SourceError;

    fn fetch(&self, source: &str) -> Result<String, Self::Error> {
        let text = self.inner.fetch(source)?;
        self.token.cancel();
        Ok(text)
    }
}

/// Sink whose first `failures` writes fail with a transient I/O error
struct FlakySink {
    inner: DirectorySink,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakySink {
    fn new(dir: &Path, failures: usize) -> Self {
        Self {
            inner: DirectorySink::new(dir),
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ReportSink for FlakySink {
    type Error = ReportError;

    fn store(&self, run_id: RunId, format: ReportFormat, body: &str) -> Result<String, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ReportError::Io {
                path: self.inner.path_for(run_id, format),
                source: std::io::Error::other("device busy"),
            });
        }
        self.inner.store(run_id, format, body)
    }
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("beta.txt"), CERTIFICATE).unwrap();
    dir
}

fn context() -> EvaluationContext {
    CompliancePolicy::default().context(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap())
}

fn config() -> PipelineConfig {
    PipelineConfig {
        backoff: BackoffConfig {
            initial_delay_ms: 1,
            multiplier: 2.0,
            max_delay_ms: 5,
        },
        ..PipelineConfig::default()
    }
}

/// Model that returns no fields, so every value comes from the pattern fallback
fn extraction_model() -> MockProvider {
    MockProvider::new("{}")
}

fn build<S, L>(
    dir: &TempDir,
    source: S,
    extraction: MockProvider,
    summaries: Option<MockProvider>,
    log: L,
    context: EvaluationContext,
    config: PipelineConfig,
) -> Pipeline<S, L>
where
    S: DocumentSource + Send + Sync + 'static,
    L: RunLogStore + Send + Sync + 'static,
{
    PipelineOrchestrator::new(
        Collaborators {
            source,
            extractor: LlmFieldExtractor::new(extraction, ExtractorConfig::default()).unwrap(),
            summarizer: summaries.map(LlmSummarizer::new),
            sink: DirectorySink::new(dir.path().join("reports")),
            log,
        },
        CompliancePolicy::default().to_ruleset().unwrap(),
        context,
        config,
    )
    .unwrap()
}

/// Pipeline over a file-backed log whose model names "Acme | Co" as the
/// only additional insured, with "Acme" required by the policy
fn acme_pipeline<K>(
    dir: &TempDir,
    sink: K,
    non_scalar: NonScalarPolicy,
) -> PipelineOrchestrator<
    FileSource,
    LlmFieldExtractor<MockProvider>,
    LlmSummarizer<MockProvider>,
    K,
    SqliteRunLog,
>
where
    K: ReportSink + Send + Sync + 'static,
{
    let policy = CompliancePolicy {
        required_additional_insureds: vec!["Acme".to_string()],
        ..CompliancePolicy::default()
    };
    let mut config = config();
    config.reports.non_scalar = non_scalar;
    let model = MockProvider::new(r#"{"additional_insureds": ["Acme | Co"]}"#);

    PipelineOrchestrator::new(
        Collaborators {
            source: FileSource::new().with_root(dir.path()),
            extractor: LlmFieldExtractor::new(model, ExtractorConfig::default()).unwrap(),
            summarizer: None,
            sink,
            log: SqliteRunLog::new(dir.path().join("runs.db")).unwrap(),
        },
        policy.to_ruleset().unwrap(),
        context(),
        config,
    )
    .unwrap()
}

fn report_files(dir: &TempDir) -> Vec<String> {
    match fs::read_dir(dir.path().join("reports")) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn simple(
    dir: &TempDir,
    extraction: MockProvider,
    summaries: Option<MockProvider>,
    config: PipelineConfig,
) -> Pipeline<FileSource, InMemoryRunLog> {
    build(
        dir,
        FileSource::new().with_root(dir.path()),
        extraction,
        summaries,
        InMemoryRunLog::new(),
        context(),
        config,
    )
}

#[tokio::test]
async fn test_compliant_certificate_runs_every_step() {
    let dir = workspace();
    let pipeline = simple(&dir, extraction_model(), Some(MockProvider::new("Coverage meets requirements.")), config());

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);
    for step in &run.steps {
        assert_eq!(step.status, StepStatus::Succeeded, "{:?}", step);
        assert_eq!(step.attempts, 1);
        assert!(step.started_at.is_some() && step.ended_at.is_some());
    }

    let compliance = run.artifacts.compliance.as_ref().unwrap();
    assert_eq!(compliance.status, AggregateStatus::Compliant);
    assert_eq!(compliance.run_id, run.run_id);
    assert_eq!(run.artifacts.summary.as_deref(), Some("Coverage meets requirements."));

    assert_eq!(run.artifacts.reports.len(), 2);
    let json = run
        .artifacts
        .reports
        .iter()
        .find(|r| r.format == ReportFormat::Json)
        .unwrap();
    let body: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json.location).unwrap()).unwrap();
    assert_eq!(body["aggregate_status"], "compliant");
    assert_eq!(body["summary"], "Coverage meets requirements.");
    assert_eq!(body["source"]["source"], "beta.txt");
}

#[tokio::test]
async fn test_summary_timeout_succeeds_with_warnings() {
    let dir = workspace();
    let slow = MockProvider::new("late summary").with_delay(Duration::from_millis(300));
    let config = PipelineConfig {
        summarize: StepPolicy::new(1, 20),
        ..config()
    };
    let pipeline = simple(&dir, extraction_model(), Some(slow), config);

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::SucceededWithWarnings);

    let summarize = run.step(StepName::Summarize);
    assert_eq!(summarize.status, StepStatus::Failed);
    assert!(summarize.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(run.step(StepName::Report).status, StepStatus::Succeeded);
    assert!(run.artifacts.summary.is_none());
    assert_eq!(run.artifacts.reports.len(), 2);
}

#[tokio::test]
async fn test_disabled_summary_is_skipped() {
    let dir = workspace();
    let config = PipelineConfig {
        summarize_enabled: false,
        ..config()
    };
    let pipeline = simple(&dir, extraction_model(), Some(MockProvider::default()), config);

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);
    let summarize = run.step(StepName::Summarize);
    assert_eq!(summarize.status, StepStatus::Skipped);
    assert_eq!(summarize.note.as_deref(), Some("summarization disabled"));
}

#[tokio::test]
async fn test_transient_extraction_failure_is_retried() {
    let dir = workspace();
    let model = extraction_model();
    model.fail_next(LlmError::Communication("connection reset".to_string()));
    let pipeline = simple(&dir, model.clone(), None, config());

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);

    let extract = run.step(StepName::Extract);
    assert_eq!(extract.status, StepStatus::Succeeded);
    assert_eq!(extract.attempts, 2);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_transient_failures_stop_at_max_attempts() {
    let dir = workspace();
    let model = extraction_model();
    for _ in 0..5 {
        model.fail_next(LlmError::RateLimitExceeded);
    }
    let pipeline = simple(&dir, model.clone(), None, config());

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.step(StepName::Extract).attempts, 3);
    assert_eq!(model.call_count(), 3);
}

#[tokio::test]
async fn test_permanent_extraction_failure_is_not_retried() {
    let dir = workspace();
    let model = extraction_model();
    model.fail_next(LlmError::Authentication("bad key".to_string()));
    let pipeline = simple(&dir, model.clone(), Some(MockProvider::default()), config());

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(model.call_count(), 1);

    let extract = run.step(StepName::Extract);
    assert_eq!(extract.status, StepStatus::Failed);
    assert_eq!(extract.attempts, 1);
    assert!(extract.error.as_deref().unwrap().contains("bad key"));

    for step in [StepName::Evaluate, StepName::Summarize, StepName::Report] {
        let record = run.step(step);
        assert_eq!(record.status, StepStatus::Skipped);
        assert_eq!(record.note.as_deref(), Some("extract failed"));
    }
    assert!(run.artifacts.document.is_some());
    assert_eq!(run.resume_point(), Some(StepName::Extract));
}

#[tokio::test]
async fn test_evaluate_failure_is_not_retried() {
    let dir = workspace();
    let invalid = context().with_minimum("general_liability", Money::from_dollars(-1));
    let pipeline = build(
        &dir,
        FileSource::new().with_root(dir.path()),
        extraction_model(),
        None,
        InMemoryRunLog::new(),
        invalid,
        config(),
    );

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);

    let evaluate = run.step(StepName::Evaluate);
    assert_eq!(evaluate.status, StepStatus::Failed);
    assert_eq!(evaluate.attempts, 1);
    assert!(evaluate.error.as_deref().unwrap().contains("must not be negative"));
    assert_eq!(run.step(StepName::Report).status, StepStatus::Skipped);
    assert!(run.artifacts.fields.is_some());
    assert!(run.artifacts.compliance.is_none());
}

#[tokio::test]
async fn test_missing_document_fails_ingest_once() {
    let dir = workspace();
    let pipeline = simple(&dir, extraction_model(), None, config());

    let run = pipeline.run("missing.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    let ingest = run.step(StepName::Ingest);
    assert_eq!(ingest.attempts, 1);
    assert!(ingest.error.as_deref().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_cancelled_run_resumes_from_next_step() {
    let dir = workspace();
    let token = CancellationToken::new();
    let model = extraction_model();
    let pipeline = build(
        &dir,
        CancellingSource {
            inner: FileSource::new().with_root(dir.path()),
            token: token.clone(),
        },
        model.clone(),
        None,
        InMemoryRunLog::new(),
        context(),
        config(),
    );

    let run_id = RunId::new();
    let run = pipeline.run_with_id(run_id, "beta.txt", &token).await.unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.step(StepName::Ingest).status, StepStatus::Succeeded);
    for step in [StepName::Extract, StepName::Evaluate, StepName::Summarize, StepName::Report] {
        assert_eq!(run.step(step).status, StepStatus::Skipped);
        assert_eq!(run.step(step).note.as_deref(), Some("cancelled"));
    }
    assert_eq!(model.call_count(), 0);
    let ingested = run.artifacts.document.clone().unwrap();

    let resumed = pipeline.resume(run_id, &CancellationToken::new()).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Succeeded);
    assert_eq!(resumed.step(StepName::Ingest).attempts, 1);
    assert_eq!(resumed.artifacts.document.as_ref(), Some(&ingested));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_resume_after_summary_failure_reruns_summary_and_report() {
    let dir = workspace();
    let extraction = extraction_model();
    let summaries = MockProvider::new("Compliant with all blocking rules.");
    summaries.fail_next(LlmError::RateLimitExceeded);
    let pipeline = simple(&dir, extraction.clone(), Some(summaries.clone()), config());

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::SucceededWithWarnings);
    assert_eq!(run.resume_point(), Some(StepName::Summarize));
    let first_result = run.artifacts.compliance.clone().unwrap();

    let resumed = pipeline.resume(run.run_id, &CancellationToken::new()).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Succeeded);
    assert_eq!(
        resumed.artifacts.summary.as_deref(),
        Some("Compliant with all blocking rules.")
    );
    assert_eq!(resumed.artifacts.compliance.as_ref(), Some(&first_result));
    assert_eq!(resumed.artifacts.reports.len(), 2);
    assert_eq!(extraction.call_count(), 1);
    assert_eq!(summaries.call_count(), 2);

    let again = pipeline.resume(run.run_id, &CancellationToken::new()).await.unwrap();
    assert_eq!(again, resumed);
}

#[tokio::test]
async fn test_failed_run_resumes_from_reopened_sqlite_log() {
    let dir = workspace();
    let db = dir.path().join("runs.db");
    let run_id = RunId::new();

    {
        let model = extraction_model();
        model.fail_next(LlmError::ModelNotAvailable("gemini-pro".to_string()));
        let pipeline = build(
            &dir,
            FileSource::new().with_root(dir.path()),
            model,
            None,
            SqliteRunLog::new(&db).unwrap(),
            context(),
            config(),
        );
        let run = pipeline
            .run_with_id(run_id, "beta.txt", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Failed);
    }

    let pipeline = build(
        &dir,
        FileSource::new().with_root(dir.path()),
        extraction_model(),
        None,
        SqliteRunLog::new(&db).unwrap(),
        context(),
        config(),
    );
    let resumed = pipeline.resume(run_id, &CancellationToken::new()).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Succeeded);
    assert_eq!(
        resumed.artifacts.compliance.as_ref().unwrap().status,
        AggregateStatus::Compliant
    );

    let events = pipeline.log().events(run_id).unwrap();
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.seq, i as u64);
    }
}

#[tokio::test]
async fn test_same_run_id_gives_identical_result() {
    let dir = workspace();
    let run_id = RunId::new();

    let mut fingerprints = Vec::new();
    let mut results = Vec::new();
    for _ in 0..2 {
        let pipeline = simple(&dir, extraction_model(), None, config());
        let run = pipeline
            .run_with_id(run_id, "beta.txt", &CancellationToken::new())
            .await
            .unwrap();
        let result = run.artifacts.compliance.unwrap();
        fingerprints.push(result.fingerprint().unwrap());
        results.push(serde_json::to_string(&result).unwrap());
    }

    assert_eq!(fingerprints[0], fingerprints[1]);
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn test_run_id_cannot_be_reused_in_one_log() {
    let dir = workspace();
    let pipeline = simple(&dir, extraction_model(), None, config());
    let run_id = RunId::new();
    let token = CancellationToken::new();

    pipeline.run_with_id(run_id, "beta.txt", &token).await.unwrap();
    let err = pipeline.run_with_id(run_id, "beta.txt", &token).await.unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateRun(id) if id == run_id));
}

#[tokio::test]
async fn test_unknown_run_is_an_error() {
    let dir = workspace();
    let pipeline = simple(&dir, extraction_model(), None, config());

    assert!(matches!(
        pipeline.load_run(RunId::new()),
        Err(PipelineError::UnknownRun(_))
    ));
    assert!(pipeline
        .resume(RunId::new(), &CancellationToken::new())
        .await
        .is_err());
}

#[tokio::test]
async fn test_batch_keeps_source_order_and_isolates_failures() {
    let dir = workspace();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join(name), CERTIFICATE).unwrap();
    }
    let config = PipelineConfig {
        max_concurrent_runs: 2,
        ..config()
    };
    let pipeline = Arc::new(simple(&dir, extraction_model(), None, config));

    let sources: Vec<String> = ["a.txt", "missing.txt", "b.txt", "c.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let outcomes = pipeline
        .run_batch(sources.clone(), &CancellationToken::new())
        .await;

    assert_eq!(outcomes.len(), 4);
    for (outcome, source) in outcomes.iter().zip(&sources) {
        assert_eq!(&outcome.source, source);
        let run = outcome.result.as_ref().unwrap();
        assert_eq!(run.source, *source);
        let expected = if source == "missing.txt" {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        assert_eq!(run.status, expected, "{}", source);
    }

    assert_eq!(pipeline.list_runs().unwrap().len(), 4);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = workspace();
    let config = PipelineConfig {
        max_concurrent_runs: 0,
        ..PipelineConfig::default()
    };
    let result = PipelineOrchestrator::new(
        Collaborators {
            source: FileSource::new(),
            extractor: LlmFieldExtractor::new(extraction_model(), ExtractorConfig::default())
                .unwrap(),
            summarizer: None::<LlmSummarizer<MockProvider>>,
            sink: DirectorySink::new(dir.path()),
            log: InMemoryRunLog::new(),
        },
        CompliancePolicy::default().to_ruleset().unwrap(),
        context(),
        config,
    );
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_unserializable_report_fails_once_and_writes_nothing() {
    let dir = workspace();
    let sink = DirectorySink::new(dir.path().join("reports"));
    let pipeline = acme_pipeline(&dir, sink, NonScalarPolicy::Reject);

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);

    let report = run.step(StepName::Report);
    assert_eq!(report.status, StepStatus::Failed);
    assert_eq!(report.attempts, 1);
    assert!(report.error.as_deref().unwrap().contains("additional_insureds"));

    // the JSON report builds fine, but must not be written without the CSV
    assert!(run.artifacts.reports.is_empty());
    assert!(report_files(&dir).is_empty(), "left on disk: {:?}", report_files(&dir));

    let fields = run.artifacts.fields.clone().unwrap();
    let compliance = run.artifacts.compliance.clone().unwrap();
    assert!(fields.contains("additional_insureds"));
    assert_eq!(run.resume_point(), Some(StepName::Report));

    // a run with a flattening report config picks up from Report
    drop(pipeline);
    let sink = DirectorySink::new(dir.path().join("reports"));
    let pipeline = acme_pipeline(&dir, sink, NonScalarPolicy::Flatten);
    let resumed = pipeline.resume(run.run_id, &CancellationToken::new()).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Succeeded);
    assert_eq!(resumed.artifacts.fields, Some(fields));
    assert_eq!(resumed.artifacts.compliance, Some(compliance));
    assert_eq!(resumed.artifacts.reports.len(), 2);
    assert_eq!(report_files(&dir).len(), 2);
}

#[tokio::test]
async fn test_transient_sink_failure_is_retried_once() {
    let dir = workspace();
    let sink = FlakySink::new(&dir.path().join("reports"), 1);
    let pipeline = acme_pipeline(&dir, sink, NonScalarPolicy::Flatten);

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);

    let report = run.step(StepName::Report);
    assert_eq!(report.status, StepStatus::Succeeded);
    assert_eq!(report.attempts, 2);
    assert_eq!(run.artifacts.reports.len(), 2);
    // one failed write, then both formats
    assert_eq!(pipeline.sink().calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_report_gives_up_after_second_transient_failure() {
    let dir = workspace();
    let sink = FlakySink::new(&dir.path().join("reports"), 2);
    let pipeline = acme_pipeline(&dir, sink, NonScalarPolicy::Flatten);

    let run = pipeline.run("beta.txt").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.step(StepName::Report).attempts, 2);
    assert!(run.artifacts.compliance.is_some());
    assert!(run.artifacts.reports.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_with_one_id_admit_one() {
    let dir = workspace();
    let pipeline = Arc::new(simple(&dir, extraction_model(), None, config()));
    let run_id = RunId::new();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .run_with_id(run_id, "beta.txt", &CancellationToken::new())
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(run) => {
                assert_eq!(run.status, RunStatus::Succeeded);
                succeeded += 1;
            }
            Err(err) => assert!(matches!(err, PipelineError::DuplicateRun(id) if id == run_id)),
        }
    }
    assert_eq!(succeeded, 1);

    let events = pipeline.log().events(run_id).unwrap();
    let starts = events
        .iter()
        .filter(|e| matches!(e.kind, RunEventKind::RunStarted { .. }))
        .count();
    assert_eq!(starts, 1);
}
