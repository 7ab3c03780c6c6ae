//! Run command implementation
//!
//! Loads the configuration, builds the orchestrator, and runs both stages.

use crate::cli::{exit_code_for, EXIT_CONFIGURATION, EXIT_STAGE_FAILURE, EXIT_SUCCESS};
use crate::config::{load_config, PipelineConfig};
use crate::log_error_with_context;
use crate::pipeline::{PipelineOrchestrator, PipelineReport};
use clap::Args;
use std::io::{self, Write};

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting pipeline run");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIGURATION);
            }
        };

        if !self.yes && !self.json && !confirm(&config)? {
            println!("Run cancelled.");
            return Ok(EXIT_SUCCESS);
        }

        self.run_with_config(&config).await
    }

    /// Runs the pipeline against an already loaded configuration
    pub async fn run_with_config(&self, config: &PipelineConfig) -> anyhow::Result<i32> {
        let orchestrator = match PipelineOrchestrator::from_config(config).await {
            Ok(o) => o,
            Err(e) => {
                log_error_with_context!(&e, "Failed to initialize pipeline");
                eprintln!("Failed to initialize pipeline: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let report = match orchestrator.run().await {
            Ok(r) => r,
            Err(e) => {
                log_error_with_context!(&e, "Pipeline run aborted");
                eprintln!("Pipeline run aborted: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_summary(&report);
        }

        Ok(if report.is_successful() {
            EXIT_SUCCESS
        } else {
            EXIT_STAGE_FAILURE
        })
    }
}

fn confirm(config: &PipelineConfig) -> anyhow::Result<bool> {
    println!("Run Configuration:");
    println!("  Storage backend: {:?}", config.storage_backend);
    println!("  Raw table: {}", config.schema.raw_table);
    println!("  Archive table: {}", config.schema.archive_table);
    println!("  Handoff: {:?} at {}", config.handoff.backend, config.handoff.path);
    println!("  Partitions: {}", config.execution.partitions);
    println!();
    print!("Proceed with run? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_summary(report: &PipelineReport) {
    let counters = report.counters();

    println!();
    println!("Run Summary ({})", report.run_id);
    println!("  Records read: {}", counters.records_read);
    println!("  Missing data: {}", counters.missing_data);
    println!("  Records anonymized: {}", counters.records_anonymized);
    println!("  Handoff lines read: {}", counters.lines_read);
    println!("  Invalid records: {}", counters.invalid_record);
    println!("  Records archived: {}", counters.records_archived);
    println!("  Duration: {:.2}s", report.duration_ms as f64 / 1000.0);
    println!();

    for stage in [&report.anonymization, &report.archival].into_iter().flatten() {
        for failure in &stage.failures {
            println!(
                "  {} partition {} failed after {} attempt(s): {}",
                stage.stage, failure.partition, failure.attempts, failure.error
            );
        }
    }

    if report.is_successful() {
        println!("Pipeline completed successfully.");
    } else {
        println!("Pipeline {}.", report.outcome);
        if report.handoff_retained {
            println!("  Intermediate handoff kept for inspection or a rerun.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_FATAL;
    use crate::config::StorageBackend;

    #[test]
    fn test_run_args_defaults() {
        let args = RunArgs::default();
        assert!(!args.json);
        assert!(!args.yes);
    }

    #[tokio::test]
    async fn test_run_with_empty_memory_source_succeeds() {
        let args = RunArgs {
            json: true,
            yes: true,
        };
        let code = args
            .run_with_config(&PipelineConfig::in_memory())
            .await
            .unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_run_with_unknown_digest_is_fatal() {
        let mut config = PipelineConfig::in_memory();
        config.pseudonymization.digest = "md5".to_string();

        let args = RunArgs {
            json: true,
            yes: true,
        };
        assert_eq!(args.run_with_config(&config).await.unwrap(), EXIT_FATAL);
    }

    #[tokio::test]
    async fn test_run_without_postgresql_section_is_configuration_error() {
        let mut config = PipelineConfig::in_memory();
        config.storage_backend = StorageBackend::PostgreSQL;

        let args = RunArgs {
            json: true,
            yes: true,
        };
        assert_eq!(
            args.run_with_config(&config).await.unwrap(),
            EXIT_CONFIGURATION
        );
    }

    #[tokio::test]
    async fn test_execute_missing_config_file() {
        let args = RunArgs {
            json: false,
            yes: true,
        };
        let code = args.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIGURATION);
    }
}
