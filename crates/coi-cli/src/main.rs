//! coi - check Certificates of Insurance against compliance rules.

use anyhow::Context;
use clap::Parser;
use coi_cli::commands;
use coi_cli::{Cli, CliError, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        let code = match e.downcast_ref::<CliError>() {
            Some(CliError::RunsFailed(_)) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, &config, &formatter).await?,
        Command::Resume(args) => commands::execute_resume(args, &config, &formatter).await?,
        Command::Show(args) => commands::execute_show(args, &config, &formatter)?,
        Command::Runs => commands::execute_runs(&config, &formatter)?,
        Command::Rules(args) => commands::execute_rules(args, &formatter)?,
        Command::Config(args) => commands::execute_config(args, &config, &formatter)?,
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides `--log-level`
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{}'", level))?,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}
