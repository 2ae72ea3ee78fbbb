//! Rules command implementation.

use crate::cli::{RulesAction, RulesArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use coi_rules::{CompliancePolicy, RuleSet, RuleSource};

/// Execute the rules command.
pub fn execute_rules(args: RulesArgs, formatter: &Formatter) -> Result<()> {
    match args.action {
        RulesAction::Check { file } => {
            let rules = RuleSet::load(RuleSource::File(file.clone()))?;
            eprintln!(
                "{}",
                formatter.success(&format!("{}: {} valid rules", file.display(), rules.len()))
            );
            println!("{}", formatter.format_rules(&rules)?);
        }
        RulesAction::Show { preset } => {
            let policy = CompliancePolicy::preset(&preset)
                .ok_or_else(|| CliError::InvalidInput(format!("Unknown policy preset: {}", preset)))?;
            println!("{}", formatter.format_rules(&policy.to_ruleset()?)?);
        }
    }
    Ok(())
}
