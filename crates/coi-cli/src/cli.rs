//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// COI compliance checker - evaluate Certificates of Insurance against policy rules.
#[derive(Debug, Parser)]
#[command(name = "coi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "COI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run documents through the compliance pipeline
    Run(RunArgs),

    /// Resume a failed, cancelled or partially succeeded run
    Resume(ResumeArgs),

    /// Show a run record
    Show(ShowArgs),

    /// List logged runs
    Runs,

    /// Inspect rule files
    Rules(RulesArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Language model access shared by run and resume.
#[derive(Debug, Clone, Parser)]
pub struct ModelArgs {
    /// Gemini API key; enables LLM extraction and summaries
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Skip the Summarize step
    #[arg(long)]
    pub no_summary: bool,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Document paths (OCR'd text files)
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Reference date for expiry checks (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Contract end date the coverage must reach (YYYY-MM-DD)
    #[arg(long)]
    pub contract_end: Option<String>,

    /// Policy preset (default, strict, permissive); overrides the config file
    #[arg(short, long)]
    pub policy: Option<String>,

    /// Rule file (.json or .toml) used instead of the policy
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Report directory; overrides the config file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the resume command.
#[derive(Debug, Parser)]
pub struct ResumeArgs {
    /// Run id
    pub run_id: String,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Run id
    pub run_id: String,

    /// Also list the raw event log
    #[arg(long)]
    pub events: bool,
}

/// Arguments for rule inspection.
#[derive(Debug, Parser)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

/// Rule inspection actions.
#[derive(Debug, Subcommand)]
pub enum RulesAction {
    /// Validate a rule file and list its rules
    Check {
        /// Rule file (.json or .toml)
        file: PathBuf,
    },

    /// List the rules a policy preset generates
    Show {
        /// Policy preset name
        #[arg(default_value = "default")]
        preset: String,
    },
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a configuration file for a preset
    Init {
        /// Preset name (default, aggressive, lenient)
        #[arg(short, long, default_value = "default")]
        preset: String,

        /// Destination file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
