//! Show command implementation.

use super::parse_run_id;
use crate::cli::ShowArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use coi_domain::traits::RunLogStore;
use coi_domain::PipelineRun;
use coi_store::SqliteRunLog;

/// Execute the show command.
pub fn execute_show(args: ShowArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let run_id = parse_run_id(&args.run_id)?;
    let log = SqliteRunLog::new(&config.run_log)?;

    let events = log.events(run_id)?;
    let run = PipelineRun::replay(&events)
        .ok_or_else(|| CliError::InvalidInput(format!("Run not found: {}", run_id)))?;

    println!("{}", formatter.format_run(&run)?);
    if args.events {
        println!("{}", formatter.format_events(&events)?);
    }
    Ok(())
}
