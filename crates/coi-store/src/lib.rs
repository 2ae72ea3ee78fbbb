//! COI Compliance Run Log Storage
//!
//! Implements the `RunLogStore` trait on SQLite.
//!
//! # Architecture
//!
//! - One `run_events` table keyed by `(run_id, seq)`
//! - Events are stored as JSON payloads next to their type name
//! - Triggers reject `UPDATE` and `DELETE`, so a stored event can never be
//!   rewritten; the `PipelineRun` view is rebuilt by replay
//!
//! # Examples
//!
//! ```
//! use coi_store::SqliteRunLog;
//! use coi_domain::traits::RunLogStore;
//! use coi_domain::RunId;
//!
//! let log = SqliteRunLog::new(":memory:").unwrap();
//! assert!(log.events(RunId::new()).unwrap().is_empty());
//! ```

#![warn(missing_docs)]

use chrono::{DateTime, SecondsFormat, Utc};
use coi_domain::traits::RunLogStore;
use coi_domain::{RunEvent, RunEventKind, RunId};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A run's sequence numbers are not contiguous from 0
    #[error("Corrupt log for run {run_id}: expected seq {expected}, found {found}")]
    SequenceGap {
        /// Run whose log is broken
        run_id: RunId,
        /// Next expected sequence number
        expected: u64,
        /// Sequence number found instead
        found: u64,
    },

    /// Another thread panicked while holding the connection
    #[error("Connection lock poisoned")]
    Poisoned,
}

/// SQLite-based implementation of RunLogStore
///
/// # Thread Safety
///
/// The connection sits behind a mutex, so one log can be shared between
/// concurrent runs. Each append runs in its own transaction, which makes
/// sequence allocation atomic per run.
pub struct SqliteRunLog {
    conn: Mutex<Connection>,
}

impl SqliteRunLog {
    /// Open (or create) a run log at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use coi_store::SqliteRunLog;
    ///
    /// let log = SqliteRunLog::new("coi-runs.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of events stored across all runs
    pub fn event_count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM run_events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Stable type name stored next to each payload
fn event_type_for(kind: &RunEventKind) -> &'static str {
    match kind {
        RunEventKind::RunStarted { .. } => "run_started",
        RunEventKind::RunResumed { .. } => "run_resumed",
        RunEventKind::StepStarted { .. } => "step_started",
        RunEventKind::StepAttemptFailed { .. } => "step_attempt_failed",
        RunEventKind::StepSucceeded { .. } => "step_succeeded",
        RunEventKind::StepFailed { .. } => "step_failed",
        RunEventKind::StepSkipped { .. } => "step_skipped",
        RunEventKind::ArtifactRecorded { .. } => "artifact_recorded",
        RunEventKind::RunFinished { .. } => "run_finished",
    }
}

fn conversion_error(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn next_seq(tx: &Transaction<'_>, run_id: RunId) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COALESCE(MAX(seq) + 1, 0) FROM run_events WHERE run_id = ?1",
        params![run_id.to_string()],
        |row| row.get(0),
    )?)
}

fn insert_event(
    tx: &Transaction<'_>,
    run_id: RunId,
    seq: i64,
    kind: RunEventKind,
) -> Result<RunEvent, StoreError> {
    let payload = serde_json::to_string(&kind)?;
    let recorded_at = Utc::now();
    tx.execute(
        "INSERT INTO run_events (run_id, seq, recorded_at, event_type, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run_id.to_string(),
            seq,
            recorded_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            event_type_for(&kind),
            &payload,
        ],
    )?;

    debug!("append run_id={} seq={} type={}", run_id, seq, event_type_for(&kind));
    Ok(RunEvent {
        run_id,
        seq: seq as u64,
        recorded_at,
        kind,
    })
}

impl RunLogStore for SqliteRunLog {
    type Error = StoreError;

    fn append(&self, run_id: RunId, kind: RunEventKind) -> Result<RunEvent, Self::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let seq = next_seq(&tx, run_id)?;
        let event = insert_event(&tx, run_id, seq, kind)?;
        tx.commit()?;
        Ok(event)
    }

    fn start(&self, run_id: RunId, kind: RunEventKind) -> Result<Option<RunEvent>, Self::Error> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock before the check, so another
        // connection to the same file cannot start the run in between
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if next_seq(&tx, run_id)? != 0 {
            debug!("start run_id={} refused, run already logged", run_id);
            return Ok(None);
        }
        let event = insert_event(&tx, run_id, 0, kind)?;
        tx.commit()?;
        Ok(Some(event))
    }

    fn events(&self, run_id: RunId) -> Result<Vec<RunEvent>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT seq, recorded_at, payload FROM run_events WHERE run_id = ?1 ORDER BY seq",
        )?;

        let events = stmt
            .query_map(params![run_id.to_string()], |row| {
                let seq: i64 = row.get(0)?;
                let recorded_at: String = row.get(1)?;
                let payload: String = row.get(2)?;

                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                    .map_err(|e| conversion_error(1, e))?
                    .with_timezone(&Utc);
                let kind: RunEventKind =
                    serde_json::from_str(&payload).map_err(|e| conversion_error(2, e))?;

                Ok(RunEvent {
                    run_id,
                    seq: seq as u64,
                    recorded_at,
                    kind,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (expected, event) in (0u64..).zip(events.iter()) {
            if event.seq != expected {
                return Err(StoreError::SequenceGap {
                    run_id,
                    expected,
                    found: event.seq,
                });
            }
        }
        Ok(events)
    }

    fn run_ids(&self) -> Result<Vec<RunId>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT run_id FROM run_events ORDER BY run_id")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        keys.iter()
            .map(|key| RunId::parse(key).map_err(StoreError::InvalidData))
            .collect()
    }
}
