// PHI Archive - Anonymization and Archival Pipeline
// Copyright (c) 2025 PHI Archive Contributors
// Licensed under the MIT License

//! # PHI Archive
//!
//! PHI Archive reads patient visits from a raw table, replaces each patient
//! name with a deterministic anonymized identifier, and archives the visit
//! under a composite key with a retention tag.
//!
//! ## Overview
//!
//! A run has two stages joined by a durable intermediate handoff:
//!
//! - **Anonymization** scans the raw table partition by partition and writes
//!   `base64(SHA-256(name))<TAB>visit_date` lines to the handoff. Rows missing
//!   a name or a visit date are counted and skipped.
//! - **Archival** reads the handoff and upserts one archive row per
//!   `<anonymized id>_<visit date>`, tagged `RET_GROUP_A_LONG_TERM` when the
//!   date starts with `201` and `RET_GROUP_B_STANDARD` otherwise. Lines that
//!   do not split into exactly two fields are counted and skipped.
//!
//! Stage 2 only runs after stage 1 completed every partition, and the handoff
//! is deleted only after both stages succeeded.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`pipeline`] - Pseudonymizer, both stages, executors, and the orchestrator
//! - [`adapters`] - PostgreSQL and in-memory tables, filesystem and in-memory handoffs
//! - [`domain`] - Records, identifiers, and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phi_archive::config::load_config;
//! use phi_archive::pipeline::PipelineOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("phi-archive.toml")?;
//!     let orchestrator = PipelineOrchestrator::from_config(&config).await?;
//!
//!     let report = orchestrator.run().await?;
//!     println!("{}: {} records archived", report.outcome, report.counters().records_archived);
//!     Ok(())
//! }
//! ```
//!
//! ## Pseudonymization
//!
//! ```rust
//! use phi_archive::pipeline::Pseudonymizer;
//!
//! let id = Pseudonymizer::default().pseudonymize("Jane Doe");
//! assert_eq!(id.as_str(), "ATMsh2UYp5O3wbjfr21LQE/12wmyHGYnyllxDMJPaWo=");
//! ```
//!
//! The digest is unsalted, so equal names always map to equal identifiers
//! across records and runs. Small name spaces can be recovered with a
//! dictionary attack.
//!
//! ## Error Handling
//!
//! Fatal conditions use [`domain::PipelineError`]. Skipped records are
//! counters in the run report, not errors.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod pipeline;
