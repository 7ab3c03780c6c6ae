//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the PHI Archive configuration file. For the PostgreSQL backend it also
//! checks that the database is reachable.

use crate::adapters::postgresql::{redact_connection_string, PostgreSQLClient};
use crate::cli::{exit_code_for, EXIT_CONFIGURATION, EXIT_SUCCESS};
use crate::config::{load_config, PipelineConfig, StorageBackend};
use crate::domain::Result;
use crate::log_error_with_context;
use crate::pipeline::DigestAlgorithm;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config already validates; a failure here covers both cases
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIGURATION);
            }
        };

        if let Err(e) = config.pseudonymization.digest.parse::<DigestAlgorithm>() {
            println!("❌ {e}");
            return Ok(exit_code_for(&e));
        }

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);

        if let Err(e) = check_connectivity(&config).await {
            log_error_with_context!(&e, "Connectivity check failed");
            println!("❌ Connectivity check failed");
            println!("   Error: {e}");
            return Ok(exit_code_for(&e));
        }

        Ok(EXIT_SUCCESS)
    }
}

/// Runs `SELECT 1` against the configured PostgreSQL database
async fn check_connectivity(config: &PipelineConfig) -> Result<()> {
    let Some(pg_config) = config.postgresql.as_ref() else {
        return Ok(());
    };
    if config.storage_backend != StorageBackend::PostgreSQL {
        return Ok(());
    }

    println!("🔌 Testing PostgreSQL connection...");
    let client = PostgreSQLClient::new(pg_config.clone()).await?;
    client.test_connection().await?;
    println!("✅ PostgreSQL connection successful");
    Ok(())
}

fn print_summary(config: &PipelineConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);

    match config.storage_backend {
        StorageBackend::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                let dsn: &str = pg_config.connection_string.expose_secret().as_ref();
                println!("  Storage Backend: PostgreSQL");
                println!("  PostgreSQL Connection: {}", redact_connection_string(dsn));
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
        }
        StorageBackend::Memory => {
            println!("  Storage Backend: in-memory");
            if let Some(ref seed) = config.memory.seed_path {
                println!("  Seed File: {seed}");
            }
        }
    }

    println!(
        "  Raw Table: {} ({})",
        config.schema.raw_table,
        config.schema.raw_families().join(", ")
    );
    println!(
        "  Archive Table: {} ({})",
        config.schema.archive_table,
        config.schema.archive_families().join(", ")
    );
    println!("  Digest: {}", config.pseudonymization.digest);
    println!(
        "  Handoff: {:?} at {}",
        config.handoff.backend, config.handoff.path
    );
    println!(
        "  Execution: {:?}, {} partitions, concurrency {}, {} attempts",
        config.execution.executor,
        config.execution.partitions,
        config.execution.max_concurrency,
        config.execution.max_attempts
    );
    println!();
}
