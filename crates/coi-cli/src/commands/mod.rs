//! Command implementations.

pub mod config;
pub mod resume;
pub mod rules;
pub mod run;
pub mod runs;
pub mod show;

pub use self::config::execute_config;
pub use self::resume::execute_resume;
pub use self::rules::execute_rules;
pub use self::run::execute_run;
pub use self::runs::execute_runs;
pub use self::show::execute_show;

use crate::error::{CliError, Result};
use coi_domain::RunId;

/// Parse a run id argument
pub(crate) fn parse_run_id(value: &str) -> Result<RunId> {
    RunId::parse(value).map_err(CliError::InvalidInput)
}
