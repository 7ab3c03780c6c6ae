// PHI Archive - Anonymization and Archival Pipeline
// Copyright (c) 2025 PHI Archive Contributors
// Licensed under the MIT License

use clap::Parser;
use phi_archive::cli::{Cli, Commands, EXIT_FATAL};
use phi_archive::config::{load_config, LoggingConfig};
use phi_archive::logging::init_logging;
use std::process;

/// Exit code after SIGINT/SIGTERM (standard Unix convention)
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the configuration when it loads; a broken file is
    // reported by the command itself
    let (config_level, logging_config) = if cli.command.uses_config() {
        match load_config(&cli.config) {
            Ok(config) => (Some(config.application.log_level), config.logging),
            Err(_) => (None, LoggingConfig::console_only()),
        }
    } else {
        (None, LoggingConfig::console_only())
    };
    let log_level = cli
        .log_level
        .clone()
        .or(config_level)
        .unwrap_or_else(|| "info".to_string());

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "PHI Archive - Anonymization and Archival Pipeline"
    );

    // An interrupted run leaves the handoff in place; the next run clears it
    let exit_code = tokio::select! {
        result = execute_command(&cli) => match result {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "Command execution failed");
                eprintln!("Error: {e}");
                EXIT_FATAL
            }
        },
        _ = shutdown_signal() => {
            tracing::warn!("Shutdown signal received, abandoning run");
            eprintln!("\n⚠️  Interrupted. The intermediate handoff was kept for inspection.");
            EXIT_INTERRUPTED
        }
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Run(args) => args.execute(&cli.config).await,
        Commands::EnsureSchema(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    Ok(()) = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
