//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Amanda CLI - Contextualize observations against structural constraints.
#[derive(Debug, Parser)]
#[command(name = "amanda")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "AMANDA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (values only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline over record files and answer queries
    Run(RunArgs),

    /// Answer queries against a database from earlier runs
    Query(QueryArgs),

    /// Profile source files for agency and constraint patterns
    Profile(ProfileArgs),

    /// Export stored facts or answers
    Export(ExportArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the run command.
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Record files (JSON array or one JSON record per line)
    #[arg(short, long)]
    pub records: Vec<PathBuf>,

    /// Touch-screen layout description (JSON)
    #[arg(long)]
    pub layout: Option<PathBuf>,

    /// Raw touches (JSON array)
    #[arg(long)]
    pub touches: Option<PathBuf>,

    /// Scope for the layout and touches
    #[arg(short, long, default_value = "kiosk")]
    pub scope: String,

    /// Subject of the touches
    #[arg(long, default_value = "subject")]
    pub subject: String,

    /// Queries to answer after the run (JSON array)
    #[arg(short, long)]
    pub queries: Option<PathBuf>,

    /// SQLite database to restore from and persist to
    #[arg(long, env = "AMANDA_DB")]
    pub db: Option<PathBuf>,
}

/// Arguments for the query command.
#[derive(Debug, Clone, Parser)]
pub struct QueryArgs {
    /// Queries to answer (JSON array)
    pub queries: PathBuf,

    /// SQLite database written by earlier runs
    #[arg(long, env = "AMANDA_DB")]
    pub db: Option<PathBuf>,

    /// Do not record the answers in the database
    #[arg(long)]
    pub no_record: bool,
}

/// Arguments for the profile command.
#[derive(Debug, Clone, Parser)]
pub struct ProfileArgs {
    /// Source files to profile
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the export command.
#[derive(Debug, Clone, Parser)]
pub struct ExportArgs {
    /// What to export
    #[arg(value_enum)]
    pub what: ExportKind,

    /// Only facts of this scope
    #[arg(short, long)]
    pub scope: Option<String>,

    /// SQLite database written by earlier runs
    #[arg(long, env = "AMANDA_DB")]
    pub db: Option<PathBuf>,
}

/// Exportable streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportKind {
    /// Correlated facts in timestamp order
    Facts,
    /// Recorded answers
    Answers,
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
    /// Print the effective configuration
    Show,

    /// Print the default configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
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
