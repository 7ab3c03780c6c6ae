//! Intermediate handoff between the anonymization and archival stages
//!
//! Stage 1 writes one text partition per task; stage 2 reads every partition
//! back. Each partition is a sequence of `id<TAB>date` lines terminated by
//! `\n`. A completion marker is written once stage 1 has finished.
//!
//! - [`fs::FsHandoff`] - directory of `part-r-NNNNN` files and a `_SUCCESS` marker
//! - [`memory::InMemoryHandoff`] - in-process buffers

pub mod fs;
pub mod memory;

pub use fs::FsHandoff;
pub use memory::InMemoryHandoff;

use crate::domain::Result;
use async_trait::async_trait;
use std::fmt;

/// Name of the completion marker written after stage 1
pub const COMPLETION_MARKER: &str = "_SUCCESS";

/// Prefix of every partition name
pub const PARTITION_PREFIX: &str = "part-r-";

/// One partition of the handoff
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandoffPartition {
    /// Index of the stage-1 task that wrote this partition
    pub index: usize,
}

impl HandoffPartition {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Partition name, e.g. `part-r-00003`
    pub fn name(&self) -> String {
        format!("{PARTITION_PREFIX}{:05}", self.index)
    }

    /// Parses a partition name produced by [`HandoffPartition::name`]
    pub fn parse_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(PARTITION_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self::new)
    }
}

impl fmt::Display for HandoffPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Storage for the intermediate handoff
#[async_trait]
pub trait HandoffStore: Send + Sync {
    /// Human-readable location used in logs and status output
    fn location(&self) -> String;

    /// Remove any handoff left by a previous run
    ///
    /// Succeeds when nothing is present.
    async fn clear(&self) -> Result<()>;

    /// Whether a handoff is present
    async fn exists(&self) -> Result<bool>;

    /// Write partition `index`, atomically replacing an earlier write of the
    /// same partition
    async fn write_partition(&self, index: usize, contents: String) -> Result<()>;

    /// All partitions in index order
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::PipelineError::Handoff`] if no handoff is present.
    async fn list_partitions(&self) -> Result<Vec<HandoffPartition>>;

    /// Full text of one partition
    async fn read_partition(&self, partition: &HandoffPartition) -> Result<String>;

    /// Record that stage 1 finished writing
    async fn mark_complete(&self) -> Result<()>;

    /// Whether the completion marker is present
    async fn is_complete(&self) -> Result<bool>;

    /// Remove the handoff
    ///
    /// Succeeds when nothing is present.
    async fn delete(&self) -> Result<()>;
}
