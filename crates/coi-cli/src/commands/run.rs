//! Run command implementation.

use crate::app;
use crate::cli::RunArgs;
use crate::config::{Config, OutputFormat};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use coi_domain::RunStatus;
use coi_pipeline::CancellationToken;
use std::sync::Arc;
use tracing::warn;

/// Execute the run command.
///
/// Every source runs as its own pipeline run; a failed document does not
/// stop the others. Returns [`CliError::RunsFailed`] when any run failed.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let policy = app::select_policy(config, args.policy.as_deref())?;
    let rules = app::load_rules(config, &policy, args.rules.as_deref())?;
    let context = app::build_context(&policy, args.as_of.as_deref(), args.contract_end.as_deref())?;
    let pipeline = Arc::new(app::build_pipeline(
        config,
        &args.model,
        rules,
        context,
        args.output,
    )?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining steps");
            interrupt.cancel();
        }
    });

    let outcomes = pipeline.run_batch(args.sources, &cancel).await;

    let mut failed = 0;
    let mut runs = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            Ok(run) => {
                if run.status != RunStatus::Succeeded
                    && run.status != RunStatus::SucceededWithWarnings
                {
                    failed += 1;
                }
                if is_table(formatter) {
                    println!("{}", formatter.run_line(&outcome.source, &run));
                }
                runs.push(run);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}", formatter.error(&format!("{}: {}", outcome.source, e)));
            }
        }
    }

    match runs.as_slice() {
        [run] => println!("{}", formatter.format_run(run)?),
        _ if !is_table(formatter) => println!("{}", formatter.format_runs(&runs)?),
        _ => {}
    }

    if failed > 0 {
        return Err(CliError::RunsFailed(failed));
    }
    Ok(())
}

fn is_table(formatter: &Formatter) -> bool {
    formatter.format() == OutputFormat::Table
}
