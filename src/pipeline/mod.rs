//! The two-stage anonymization and archival pipeline.
//!
//! - [`pseudonymizer`] - name to anonymized identifier
//! - [`anonymize`] - stage 1, raw records to handoff lines
//! - [`archive`] - stage 2, handoff lines to archive rows
//! - [`executor`] - partition scheduling with retries
//! - [`orchestrator`] - stage sequencing and handoff lifecycle
//! - [`counters`] / [`report`] - run accounting
//!
//! # Example
//!
//! ```rust
//! use phi_archive::adapters::handoff::InMemoryHandoff;
//! use phi_archive::adapters::memory::{InMemoryArchive, InMemoryProvisioner, InMemorySource};
//! use phi_archive::adapters::storage::StorageBackends;
//! use phi_archive::domain::RawRecord;
//! use phi_archive::pipeline::{PipelineOrchestrator, SequentialExecutor};
//! use std::sync::Arc;
//!
//! # async fn example() -> phi_archive::domain::Result<()> {
//! let storage = StorageBackends {
//!     source: Arc::new(InMemorySource::from_records([
//!         RawRecord::complete("row-1", "Jane Doe", "2015-03-01"),
//!     ])),
//!     archive: Arc::new(InMemoryArchive::new()),
//!     provisioner: Arc::new(InMemoryProvisioner::new()),
//! };
//! let orchestrator = PipelineOrchestrator::new(
//!     storage,
//!     Arc::new(InMemoryHandoff::new()),
//!     Arc::new(SequentialExecutor::default()),
//! );
//!
//! let report = orchestrator.run().await?;
//! assert!(report.is_successful());
//! # Ok(())
//! # }
//! ```

pub mod anonymize;
pub mod archive;
pub mod counters;
pub mod executor;
pub mod orchestrator;
pub mod pseudonymizer;
pub mod report;

pub use anonymize::{anonymize_record, AnonymizationStage};
pub use archive::{archive_line, ArchivalStage};
pub use counters::StageCounters;
pub use executor::{
    create_executor, PartitionTask, RetryPolicy, SequentialExecutor, StageExecutor,
    WorkerPoolExecutor,
};
pub use orchestrator::{PipelineOrchestrator, PipelineState, PipelineStatus, RunOutcome};
pub use pseudonymizer::{DigestAlgorithm, Pseudonymizer};
pub use report::{PartitionFailure, PipelineReport, StageReport};
