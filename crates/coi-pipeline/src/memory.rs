//! In-memory run log

use chrono::Utc;
use coi_domain::traits::RunLogStore;
use coi_domain::{RunEvent, RunEventKind, RunId};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard};

/// Run log kept in process memory
///
/// Used by tests and one-shot CLI invocations. Sequence numbers start at 0
/// for each run and are assigned under a single lock.
#[derive(Debug, Default)]
pub struct InMemoryRunLog {
    runs: Mutex<BTreeMap<RunId, Vec<RunEvent>>>,
}

impl InMemoryRunLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RunId, Vec<RunEvent>>> {
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunLogStore for InMemoryRunLog {
    type Error = Infallible;

    fn append(&self, run_id: RunId, kind: RunEventKind) -> Result<RunEvent, Self::Error> {
        let mut runs = self.lock();
        let events = runs.entry(run_id).or_default();
        let event = RunEvent {
            run_id,
            seq: events.len() as u64,
            recorded_at: Utc::now(),
            kind,
        };
        events.push(event.clone());
        Ok(event)
    }

    fn start(&self, run_id: RunId, kind: RunEventKind) -> Result<Option<RunEvent>, Self::Error> {
        let mut runs = self.lock();
        if runs.get(&run_id).is_some_and(|events| !events.is_empty()) {
            return Ok(None);
        }
        let event = RunEvent {
            run_id,
            seq: 0,
            recorded_at: Utc::now(),
            kind,
        };
        runs.insert(run_id, vec![event.clone()]);
        Ok(Some(event))
    }

    fn events(&self, run_id: RunId) -> Result<Vec<RunEvent>, Self::Error> {
        Ok(self.lock().get(&run_id).cloned().unwrap_or_default())
    }

    fn run_ids(&self) -> Result<Vec<RunId>, Self::Error> {
        Ok(self.lock().keys().copied().collect())
    }
}
