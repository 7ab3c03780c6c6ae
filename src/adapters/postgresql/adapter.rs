//! PostgreSQL implementation of the storage traits
//!
//! Each table has a `row_key TEXT PRIMARY KEY` column and one `JSONB` column
//! per column family; columns are keys inside the family object:
//!
//! ```text
//! phi_raw_data(row_key, raw_cf {"name": ..}, meta_cf {"visit_dt": ..})
//! phi_archive_data(row_key, anon_cf {"visit_dt": ..}, meta_cf {"retention_tag": ..})
//! ```

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::storage::traits::{ArchiveStore, SchemaProvisioner, SourceStore};
use crate::config::TableSchema;
use crate::domain::{ArchivalRecord, CompositeKey, PipelineError, RawRecord, Result, RetentionTag};
use async_trait::async_trait;
use std::sync::Arc;

/// PostgreSQL implementation of the storage traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    schema: TableSchema,
}

impl PostgreSQLAdapter {
    /// Adapter over a shared pool; `schema` names the tables and columns
    pub fn new(client: Arc<PostgreSQLClient>, schema: TableSchema) -> Self {
        Self { client, schema }
    }
}

/// Quotes an identifier that has already passed [`TableSchema::validate`]
fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, families: [&str; 2]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    row_key TEXT PRIMARY KEY,\n    {} JSONB NOT NULL DEFAULT '{{}}'::jsonb,\n    {} JSONB NOT NULL DEFAULT '{{}}'::jsonb\n);",
        ident(table),
        ident(families[0]),
        ident(families[1]),
    )
}

fn provisioning_sql(schema: &TableSchema) -> String {
    format!(
        "{}\n{}",
        create_table_sql(&schema.raw_table, schema.raw_families()),
        create_table_sql(&schema.archive_table, schema.archive_families()),
    )
}

fn scan_partition_sql(schema: &TableSchema) -> String {
    // Same assignment as partition_of: first 4 digest bytes as an unsigned
    // integer. COLLATE "C" orders row keys bytewise.
    format!(
        "SELECT row_key,\n       {raw} ->> $3::text AS patient_name,\n       {meta} ->> $4::text AS visit_date\nFROM {table}\nWHERE ('x' || substr(encode(sha256(convert_to(row_key, 'UTF8')), 'hex'), 1, 8))::bit(32)::bigint % $1 = $2\nORDER BY row_key COLLATE \"C\"",
        raw = ident(&schema.raw_family),
        meta = ident(&schema.metadata_family),
        table = ident(&schema.raw_table),
    )
}

fn upsert_sql(schema: &TableSchema) -> String {
    format!(
        "INSERT INTO {table} (row_key, {anon}, {meta})\nVALUES ($1, jsonb_build_object($2::text, $3::text), jsonb_build_object($4::text, $5::text))\nON CONFLICT (row_key) DO UPDATE SET\n    {anon} = EXCLUDED.{anon},\n    {meta} = EXCLUDED.{meta}",
        table = ident(&schema.archive_table),
        anon = ident(&schema.anonymized_family),
        meta = ident(&schema.metadata_family),
    )
}

fn get_sql(schema: &TableSchema) -> String {
    format!(
        "SELECT {anon} ->> $2::text AS visit_date, {meta} ->> $3::text AS retention_tag FROM {table} WHERE row_key = $1",
        table = ident(&schema.archive_table),
        anon = ident(&schema.anonymized_family),
        meta = ident(&schema.metadata_family),
    )
}

#[async_trait]
impl SchemaProvisioner for PostgreSQLAdapter {
    async fn ensure_schema(&self, schema: &TableSchema) -> Result<()> {
        schema.validate().map_err(PipelineError::Schema)?;

        self.client
            .batch_execute(&provisioning_sql(schema))
            .await
            .map_err(|e| PipelineError::Schema(format!("Failed to provision tables: {}", e)))?;

        tracing::info!(
            raw_table = %schema.raw_table,
            archive_table = %schema.archive_table,
            "PostgreSQL tables ensured"
        );
        Ok(())
    }
}

#[async_trait]
impl SourceStore for PostgreSQLAdapter {
    async fn scan_partition(&self, partition: usize, partitions: usize) -> Result<Vec<RawRecord>> {
        let modulus = partitions as i64;
        let remainder = partition as i64;
        let rows = self
            .client
            .query(
                &scan_partition_sql(&self.schema),
                &[
                    &modulus,
                    &remainder,
                    &self.schema.patient_name_column,
                    &self.schema.visit_date_column,
                ],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(RawRecord::new(
                    row.try_get::<_, String>("row_key")
                        .map_err(|e| PipelineError::Storage(e.to_string()))?,
                    row.try_get::<_, Option<String>>("patient_name")
                        .map_err(|e| PipelineError::Storage(e.to_string()))?,
                    row.try_get::<_, Option<String>>("visit_date")
                        .map_err(|e| PipelineError::Storage(e.to_string()))?,
                ))
            })
            .collect()
    }

    async fn count(&self) -> Result<u64> {
        count_rows(&self.client, &self.schema.raw_table).await
    }
}

#[async_trait]
impl ArchiveStore for PostgreSQLAdapter {
    async fn upsert(&self, record: &ArchivalRecord) -> Result<()> {
        self.client
            .execute(
                &upsert_sql(&self.schema),
                &[
                    &record.composite_key.as_str(),
                    &self.schema.visit_date_column,
                    &record.visit_date,
                    &self.schema.retention_tag_column,
                    &record.retention_tag.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> Result<Option<ArchivalRecord>> {
        let rows = self
            .client
            .query(
                &get_sql(&self.schema),
                &[
                    &key.as_str(),
                    &self.schema.visit_date_column,
                    &self.schema.retention_tag_column,
                ],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let visit_date: Option<String> = row
            .try_get("visit_date")
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        let retention_tag: Option<String> = row
            .try_get("retention_tag")
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        let retention_tag = retention_tag
            .ok_or_else(|| PipelineError::Storage(format!("Archive row {key} has no retention tag")))?
            .parse::<RetentionTag>()
            .map_err(PipelineError::Storage)?;

        Ok(Some(ArchivalRecord {
            composite_key: key.clone(),
            visit_date: visit_date.unwrap_or_default(),
            retention_tag,
        }))
    }

    async fn count(&self) -> Result<u64> {
        count_rows(&self.client, &self.schema.archive_table).await
    }
}

async fn count_rows(client: &PostgreSQLClient, table: &str) -> Result<u64> {
    let rows = client
        .query(&format!("SELECT COUNT(*) FROM {}", ident(table)), &[])
        .await?;
    let count: i64 = rows
        .first()
        .ok_or_else(|| PipelineError::Storage("COUNT returned no rows".to_string()))?
        .try_get(0)
        .map_err(|e| PipelineError::Storage(e.to_string()))?;
    Ok(count as u64)
}
