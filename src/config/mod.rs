//! Configuration management.
//!
//! TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! The configuration file supports:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for every optional setting
//! - `PHI_ARCHIVE_<SECTION>_<KEY>` environment overrides
//! - Validation before anything touches storage
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use phi_archive::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phi-archive.toml")?;
//!
//! println!("Source table: {}", config.schema.raw_table);
//! println!("Handoff: {}", config.handoff.path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`TableSchema`] - Table, column-family, and column names
//! - [`PseudonymizationConfig`] - Digest algorithm
//! - [`HandoffConfig`] - Intermediate handoff backend and location
//! - [`ExecutionConfig`] - Partitioning, concurrency, and retries
//! - [`PostgreSQLConfig`] / [`MemoryConfig`] - Storage backends
//! - [`LoggingConfig`] - Console and rolling-file logging
//!
//! # Example Configuration
//!
//! ```toml
//! storage_backend = "postgresql"
//!
//! [schema]
//! raw_table = "phi_raw_data"
//! archive_table = "phi_archive_data"
//!
//! [handoff]
//! path = "/tmp/phi_intermediate_data"
//!
//! [execution]
//! partitions = 4
//! max_attempts = 4
//!
//! [postgresql]
//! connection_string = "${PHI_ARCHIVE_PG_DSN}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ExecutionConfig, ExecutorKind, HandoffBackend, HandoffConfig,
    LoggingConfig, MemoryConfig, PipelineConfig, PostgreSQLConfig, PseudonymizationConfig,
    StorageBackend, TableSchema,
};
pub use secret::{secret_string, SecretString, SecretValue};
