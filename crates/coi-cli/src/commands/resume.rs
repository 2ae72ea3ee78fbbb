//! Resume command implementation.

use super::parse_run_id;
use crate::app;
use crate::cli::ResumeArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use coi_domain::RunStatus;
use coi_pipeline::CancellationToken;

/// Execute the resume command.
///
/// The run keeps the evaluation context it was started with; the rules and
/// model settings come from the current configuration.
pub async fn execute_resume(
    args: ResumeArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let run_id = parse_run_id(&args.run_id)?;
    let rules = app::load_rules(config, &config.policy, None)?;
    let context = config.policy.context(app::today());
    let pipeline = app::build_pipeline(config, &args.model, rules, context, None)?;

    let existing = pipeline.load_run(run_id)?;
    if existing.resume_point().is_none() {
        eprintln!("{}", formatter.info(&format!("Run {} is already {}", run_id, existing.status)));
    }

    let run = pipeline.resume(run_id, &CancellationToken::new()).await?;
    println!("{}", formatter.format_run(&run)?);

    match run.status {
        RunStatus::Succeeded | RunStatus::SucceededWithWarnings => Ok(()),
        _ => Err(CliError::RunsFailed(1)),
    }
}
