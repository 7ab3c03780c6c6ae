//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - Human-readable or JSON console output
//! - Configurable log levels, overridable with `RUST_LOG`
//! - Local JSON file logging with rotation
//!
//! Log events carry counts, partition numbers, and stage names. Patient
//! names, anonymized identifiers, and visit dates are never logged.
//!
//! # Example
//!
//! ```no_run
//! use phi_archive::logging::init_logging;
//! use phi_archive::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(stage = "anonymization", "Stage started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use phi_archive::log_stage_start;
///
/// log_stage_start!("anonymization", 4);
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $partitions:expr) => {
        tracing::info!(stage = %$stage, partitions = $partitions, "Stage started");
    };
}

/// Log the completion of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use phi_archive::log_stage_complete;
/// use std::time::Duration;
///
/// log_stage_complete!("archival", true, Duration::from_millis(840));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $succeeded:expr, $duration:expr) => {
        tracing::info!(
            stage = %$stage,
            succeeded = $succeeded,
            duration_ms = $duration.as_millis() as u64,
            "Stage finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use phi_archive::log_error_with_context;
/// use phi_archive::domain::PipelineError;
///
/// let error = PipelineError::Storage("connection reset".to_string());
/// log_error_with_context!(&error, "Failed to scan partition");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a partition retry
///
/// # Example
///
/// ```no_run
/// use phi_archive::log_retry_attempt;
///
/// log_retry_attempt!("anonymization", 2, 2, 4, "connection reset");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($stage:expr, $partition:expr, $attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            stage = %$stage,
            partition = $partition,
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying partition"
        );
    };
}
