//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for PHI Archive using clap.

pub mod commands;

use crate::domain::PipelineError;
use clap::{Parser, Subcommand};

/// Process exit code for a run where every stage succeeded
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for a run in which a stage failed
pub const EXIT_STAGE_FAILURE: i32 = 1;
/// Process exit code for an unusable configuration
pub const EXIT_CONFIGURATION: i32 = 2;
/// Process exit code for a fatal environment or storage error
pub const EXIT_FATAL: i32 = 3;

/// Map a fatal error to the process exit code
pub fn exit_code_for(error: &PipelineError) -> i32 {
    match error {
        PipelineError::Configuration(_) => EXIT_CONFIGURATION,
        _ => EXIT_FATAL,
    }
}

/// PHI Archive - two-stage anonymization and archival pipeline
#[derive(Parser, Debug)]
#[command(name = "phi-archive")]
#[command(version, about, long_about = None)]
#[command(author = "PHI Archive Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "phi-archive.toml",
        env = "PHI_ARCHIVE_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PHI_ARCHIVE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymize the raw table and archive the result
    Run(commands::run::RunArgs),

    /// Create the raw and archive tables if they do not exist
    EnsureSchema(commands::ensure_schema::EnsureSchemaArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show intermediate handoff and table state
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Commands {
    /// Whether the command reads the configuration file before doing work
    pub fn uses_config(&self) -> bool {
        !matches!(self, Commands::Init(_))
    }
}
