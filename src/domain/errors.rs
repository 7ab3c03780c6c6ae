//! Domain error types
//!
//! This module defines the error hierarchy for the pipeline. Errors are
//! domain-specific and don't expose third-party driver types.
//!
//! Only fatal conditions are represented here. Per-record problems (a raw row
//! missing a required column, a malformed handoff line) are never errors: they
//! are counted and the record is skipped.

use thiserror::Error;

/// Main pipeline error type
///
/// Every variant aborts the operation that produced it. A stage whose
/// partitions could not complete is not an error: the orchestrator records
/// it in the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Table or column-family provisioning failed
    #[error("Schema provisioning error: {0}")]
    Schema(String),

    /// The requested digest algorithm is not available in this build
    #[error("Digest algorithm unavailable: {0}")]
    DigestUnavailable(String),

    /// Source or archive table access failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Intermediate handoff read, write, or cleanup failed
    #[error("Intermediate handoff error: {0}")]
    Handoff(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Whether the error is an environment fault that must abort a run
    /// before any record is processed
    pub fn is_environment_fault(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_)
                | PipelineError::Schema(_)
                | PipelineError::DigestUnavailable(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_handoff_error_display() {
        let err = PipelineError::Handoff("part-r-00002 is missing".to_string());
        assert_eq!(
            err.to_string(),
            "Intermediate handoff error: part-r-00002 is missing"
        );
    }

    #[test]
    fn test_environment_fault_classification() {
        assert!(PipelineError::DigestUnavailable("md4".to_string()).is_environment_fault());
        assert!(PipelineError::Schema("denied".to_string()).is_environment_fault());
        assert!(!PipelineError::Handoff("gone".to_string()).is_environment_fault());
        assert!(!PipelineError::Storage("timeout".to_string()).is_environment_fault());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: PipelineError = toml_err.into();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_pipeline_error_implements_std_error() {
        let err = PipelineError::Storage("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
