//! Report storage on the local filesystem

use crate::error::ReportError;
use coi_domain::traits::ReportSink;
use coi_domain::{ReportFormat, RunId};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Distinguishes temporary files of concurrent writes in one process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes each report to `<dir>/<run_id>.<ext>`
///
/// Writes go to a temporary file that is renamed into place, so a reader
/// never sees a half-written report. Every write has its own temporary
/// file, so an abandoned attempt still running cannot clobber its retry.
/// Storing the same run and format again replaces the previous file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a report for this run and format is written to
    pub fn path_for(&self, run_id: RunId, format: ReportFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", run_id, format.extension()))
    }

    fn partial_path(&self, run_id: RunId, format: ReportFormat) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            "{}.{}.{}-{}.partial",
            run_id,
            format.extension(),
            std::process::id(),
            seq
        ))
    }
}

impl ReportSink for DirectorySink {
    type Error = ReportError;

    fn store(&self, run_id: RunId, format: ReportFormat, body: &str) -> Result<String, Self::Error> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ReportError::Io { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        let target = self.path_for(run_id, format);
        let partial = self.partial_path(run_id, format);
        fs::write(&partial, body).map_err(io_error(&partial))?;
        if let Err(source) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(ReportError::Io {
                path: target,
                source,
            });
        }

        info!("Wrote {} report to {}", format.extension(), target.display());
        Ok(target.display().to_string())
    }
}
