//! Storage abstraction traits
//!
//! The pipeline talks to its tables only through these traits, so the
//! PostgreSQL backend and the in-memory backend are interchangeable and tests
//! can inject failing implementations.

use crate::config::TableSchema;
use crate::domain::{ArchivalRecord, CompositeKey, RawRecord, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Creates the source and archive tables with their column families
#[async_trait]
pub trait SchemaProvisioner: Send + Sync {
    /// Ensure both tables exist
    ///
    /// Tables that already exist are left untouched, so calling this any
    /// number of times has the same effect as calling it once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::PipelineError::Schema`] if a table cannot be
    /// created or inspected.
    async fn ensure_schema(&self, schema: &TableSchema) -> Result<()>;
}

/// Read access to the source table
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Return the rows assigned to `partition` out of `partitions`
    ///
    /// A row belongs to [`partition_of`] its row key, so membership does not
    /// depend on any other row. Rows come back in ascending row-key order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::PipelineError::Storage`] on read failures.
    async fn scan_partition(&self, partition: usize, partitions: usize) -> Result<Vec<RawRecord>>;

    /// Number of rows in the source table
    async fn count(&self) -> Result<u64>;
}

/// Write access to the archive table
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Write a record at its composite key, replacing every stored field of
    /// an existing row with the same key
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::PipelineError::Storage`] on write failures.
    async fn upsert(&self, record: &ArchivalRecord) -> Result<()>;

    /// Read the row stored at `key`
    async fn get(&self, key: &CompositeKey) -> Result<Option<ArchivalRecord>>;

    /// Number of rows in the archive table
    async fn count(&self) -> Result<u64>;
}

/// Partition that owns `row_key` out of `partitions`
///
/// The first four bytes of the key's SHA-256 digest, read as a big-endian
/// `u32`, reduced modulo `partitions`. PostgreSQL computes the same value in
/// SQL, so both backends split a table identically. Returns `None` when
/// `partitions` is zero.
pub fn partition_of(row_key: &str, partitions: usize) -> Option<usize> {
    if partitions == 0 {
        return None;
    }
    let digest = Sha256::digest(row_key.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    Some(prefix as usize % partitions)
}
