//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so a single
//! test performs the initialization.

use phi_archive::config::LoggingConfig;
use phi_archive::domain::PipelineError;
use phi_archive::logging::init_logging;
use phi_archive::{log_error_with_context, log_retry_attempt, log_stage_complete, log_stage_start};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "/var/log/phi-archive");
    assert_eq!(config.local_rotation, "daily");
    assert!(!config.json_console);
}

#[test]
fn test_console_only_config() {
    let config = LoggingConfig::console_only();
    assert!(!config.local_enabled);
    assert!(config.local_path.is_empty());
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let result = init_logging("verbose", &LoggingConfig::console_only());
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[test]
fn test_file_logging_initialization() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
        json_console: false,
    };
    assert!(!log_path.exists());

    let guard = init_logging("debug", &config).expect("first initialization");
    assert!(guard.has_file_writer());
    assert!(log_path.is_dir());

    log_stage_start!("anonymization", 4);
    log_retry_attempt!("anonymization", 2, 2, 4, "connection reset");
    let error = PipelineError::Storage("connection reset".to_string());
    log_error_with_context!(&error, "Failed to scan partition");
    log_stage_complete!("anonymization", true, Duration::from_millis(12));
    drop(guard);

    // A second subscriber cannot be installed
    let again = init_logging("info", &LoggingConfig::console_only());
    assert!(matches!(again, Err(PipelineError::Configuration(_))));

    let files: Vec<_> = std::fs::read_dir(&log_path).unwrap().collect();
    assert_eq!(files.len(), 1);
}
