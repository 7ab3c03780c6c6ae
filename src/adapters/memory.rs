//! In-process storage backend
//!
//! Tables are ordered maps guarded by `tokio::sync::RwLock`. Used for local
//! runs seeded from a JSON file and throughout the test suite.

use crate::adapters::storage::traits::{
    partition_of, ArchiveStore, SchemaProvisioner, SourceStore,
};
use crate::config::TableSchema;
use crate::domain::{ArchivalRecord, CompositeKey, PipelineError, RawRecord, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::RwLock;

/// Source table held in memory, ordered by row key
#[derive(Default)]
pub struct InMemorySource {
    rows: RwLock<BTreeMap<String, RawRecord>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a source table from records; a repeated row key keeps the last record
    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| (record.row_key.clone(), record))
            .collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Loads a JSON array of raw records
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the file cannot be read or
    /// is not a JSON array of records.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Failed to read seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        let records: Vec<RawRecord> = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::Configuration(format!(
                "Invalid seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!(rows = records.len(), "Loaded source seed file");
        Ok(Self::from_records(records))
    }

    pub async fn insert(&self, record: RawRecord) {
        self.rows.write().await.insert(record.row_key.clone(), record);
    }
}

#[async_trait]
impl SourceStore for InMemorySource {
    async fn scan_partition(&self, partition: usize, partitions: usize) -> Result<Vec<RawRecord>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|record| partition_of(&record.row_key, partitions) == Some(partition))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().await.len() as u64)
    }
}

/// Archive table held in memory
#[derive(Default)]
pub struct InMemoryArchive {
    rows: RwLock<BTreeMap<CompositeKey, ArchivalRecord>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every archived row in key order
    pub async fn snapshot(&self) -> Vec<ArchivalRecord> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchive {
    async fn upsert(&self, record: &ArchivalRecord) -> Result<()> {
        self.rows
            .write()
            .await
            .insert(record.composite_key.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> Result<Option<ArchivalRecord>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().await.len() as u64)
    }
}

/// Records which tables and families have been provisioned
#[derive(Default)]
pub struct InMemoryProvisioner {
    tables: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisioned table names with their column families
    pub async fn tables(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.tables.read().await.clone()
    }
}

#[async_trait]
impl SchemaProvisioner for InMemoryProvisioner {
    async fn ensure_schema(&self, schema: &TableSchema) -> Result<()> {
        schema.validate().map_err(PipelineError::Schema)?;

        let mut tables = self.tables.write().await;
        for (table, families) in [
            (&schema.raw_table, schema.raw_families()),
            (&schema.archive_table, schema.archive_families()),
        ] {
            // Existing tables keep their families
            tables
                .entry(table.clone())
                .or_insert_with(|| families.iter().map(|f| f.to_string()).collect());
        }
        Ok(())
    }
}
