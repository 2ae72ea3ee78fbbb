//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::fs;

/// Execute the config command.
pub fn execute_config(args: ConfigArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Init {
            preset,
            output,
            force,
        } => {
            let config = Config::preset(&preset)
                .ok_or_else(|| CliError::InvalidInput(format!("Unknown preset: {}", preset)))?;
            let contents = config.to_toml().map_err(CliError::Config)?;

            match output {
                Some(path) => {
                    if path.exists() && !force {
                        return Err(CliError::InvalidInput(format!(
                            "{} already exists (use --force to overwrite)",
                            path.display()
                        )));
                    }
                    fs::write(&path, contents)?;
                    eprintln!(
                        "{}",
                        formatter.success(&format!("Wrote {} configuration to {}", preset, path.display()))
                    );
                }
                None => print!("{}", contents),
            }
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml().map_err(CliError::Config)?);
        }
    }
    Ok(())
}
