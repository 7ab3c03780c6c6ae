//! Storage integrations.
//!
//! - [`storage`] - trait-based abstraction over the source and archive tables
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - in-process implementation for local runs and tests
//! - [`handoff`] - the intermediate handoff between the two stages
//!
//! The pipeline only sees `Arc<dyn Trait + Send + Sync>` collaborators, so a
//! test can substitute any of them:
//!
//! ```rust
//! use phi_archive::adapters::memory::{InMemoryArchive, InMemorySource};
//! use phi_archive::adapters::storage::{ArchiveStore, SourceStore};
//! use phi_archive::domain::RawRecord;
//! use std::sync::Arc;
//!
//! let source: Arc<dyn SourceStore + Send + Sync> = Arc::new(InMemorySource::from_records([
//!     RawRecord::complete("row-1", "Jane Doe", "2015-03-01"),
//! ]));
//! let archive: Arc<dyn ArchiveStore + Send + Sync> = Arc::new(InMemoryArchive::new());
//! ```

pub mod handoff;
pub mod memory;
pub mod postgresql;
pub mod storage;
