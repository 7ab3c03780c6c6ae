//! Status command implementation
//!
//! This module implements the `status` command, which reports whether an
//! intermediate handoff is left over and how many rows each table holds.

use crate::cli::{exit_code_for, EXIT_CONFIGURATION, EXIT_SUCCESS};
use crate::config::{load_config, PipelineConfig};
use crate::pipeline::{PipelineOrchestrator, PipelineStatus};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Print the status as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking pipeline status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(EXIT_CONFIGURATION);
            }
        };

        self.report(&config).await
    }

    async fn report(&self, config: &PipelineConfig) -> anyhow::Result<i32> {
        let status = match PipelineOrchestrator::from_config(config).await {
            Ok(orchestrator) => orchestrator.status().await,
            Err(e) => Err(e),
        };

        let status = match status {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pipeline status");
                println!("❌ Failed to read pipeline status");
                println!("   Error: {}", e);
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_status(&status);
        }
        Ok(EXIT_SUCCESS)
    }
}

fn print_status(status: &PipelineStatus) {
    println!("📊 Pipeline Status");
    println!();
    println!("  Handoff location: {}", status.handoff_location);
    if status.handoff_present {
        println!(
            "  Handoff: present, {} partition(s), stage 1 {}",
            status.handoff_partitions,
            if status.handoff_complete {
                "completed"
            } else {
                "did not complete"
            }
        );
        println!("  A previous run did not finish; the next run clears this handoff.");
    } else {
        println!("  Handoff: none");
    }
    println!("  Source rows: {}", status.source_rows);
    println!("  Archive rows: {}", status.archive_rows);
    println!();
}
