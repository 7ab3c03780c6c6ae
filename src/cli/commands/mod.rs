//! CLI command implementations
//!
//! Each command returns the process exit code; only unexpected I/O on the
//! terminal surfaces as an `Err`.

pub mod ensure_schema;
pub mod init;
pub mod run;
pub mod status;
pub mod validate;
