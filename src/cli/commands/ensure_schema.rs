//! Ensure-schema command implementation
//!
//! Provisions the raw and archive tables without running either stage.

use crate::cli::{exit_code_for, EXIT_CONFIGURATION, EXIT_SUCCESS};
use crate::config::{load_config, PipelineConfig};
use crate::pipeline::PipelineOrchestrator;
use clap::Args;

/// Arguments for the ensure-schema command
#[derive(Args, Debug)]
pub struct EnsureSchemaArgs {}

impl EnsureSchemaArgs {
    /// Execute the ensure-schema command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIGURATION);
            }
        };

        self.provision(&config).await
    }

    async fn provision(&self, config: &PipelineConfig) -> anyhow::Result<i32> {
        tracing::info!(
            raw_table = %config.schema.raw_table,
            archive_table = %config.schema.archive_table,
            "Provisioning tables"
        );

        let result = match PipelineOrchestrator::from_config(config).await {
            Ok(orchestrator) => orchestrator.ensure_schema().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                println!("✅ Tables are ready");
                println!(
                    "  {}: {}",
                    config.schema.raw_table,
                    config.schema.raw_families().join(", ")
                );
                println!(
                    "  {}: {}",
                    config.schema.archive_table,
                    config.schema.archive_families().join(", ")
                );
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                tracing::error!(error = %e, "Table provisioning failed");
                println!("❌ Table provisioning failed");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
