//! Runs command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use coi_domain::traits::RunLogStore;
use coi_domain::PipelineRun;
use coi_store::SqliteRunLog;
use tracing::warn;

/// Execute the runs command.
pub fn execute_runs(config: &Config, formatter: &Formatter) -> Result<()> {
    let log = SqliteRunLog::new(&config.run_log)?;

    let mut runs = Vec::new();
    for run_id in log.run_ids()? {
        match PipelineRun::replay(&log.events(run_id)?) {
            Some(run) => runs.push(run),
            None => warn!("Run {} has no start event, skipping", run_id),
        }
    }

    println!("{}", formatter.format_runs(&runs)?);
    Ok(())
}
