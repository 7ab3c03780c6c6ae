//! Storage factory
//!
//! Builds the storage collaborators named by the configuration.

use crate::adapters::handoff::{FsHandoff, HandoffStore, InMemoryHandoff};
use crate::adapters::memory::{InMemoryArchive, InMemoryProvisioner, InMemorySource};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::adapters::storage::traits::{ArchiveStore, SchemaProvisioner, SourceStore};
use crate::config::schema::{HandoffBackend, HandoffConfig, PipelineConfig, StorageBackend};
use crate::domain::{PipelineError, Result};
use std::sync::Arc;

/// The three table-facing collaborators of a pipeline run
#[derive(Clone)]
pub struct StorageBackends {
    pub source: Arc<dyn SourceStore + Send + Sync>,
    pub archive: Arc<dyn ArchiveStore + Send + Sync>,
    pub provisioner: Arc<dyn SchemaProvisioner + Send + Sync>,
}

/// Create the storage backends selected by `storage_backend`
///
/// For PostgreSQL all three roles share one adapter and connection pool.
///
/// # Errors
///
/// Returns an error if the backend section is missing, the seed file cannot
/// be loaded, or the PostgreSQL pool cannot be created.
pub async fn create_storage_backends(config: &PipelineConfig) -> Result<StorageBackends> {
    match config.storage_backend {
        StorageBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                PipelineError::Configuration(
                    "postgresql configuration is required when storage_backend = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL storage backend");
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);
            let adapter = Arc::new(PostgreSQLAdapter::new(client, config.schema.clone()));

            Ok(StorageBackends {
                source: adapter.clone() as Arc<dyn SourceStore + Send + Sync>,
                archive: adapter.clone() as Arc<dyn ArchiveStore + Send + Sync>,
                provisioner: adapter as Arc<dyn SchemaProvisioner + Send + Sync>,
            })
        }
        StorageBackend::Memory => {
            let source = match config.memory.seed_path {
                Some(ref path) => InMemorySource::from_seed_file(path)?,
                None => InMemorySource::new(),
            };

            tracing::warn!("Using in-memory storage; archived rows are discarded on exit");
            Ok(StorageBackends {
                source: Arc::new(source),
                archive: Arc::new(InMemoryArchive::new()),
                provisioner: Arc::new(InMemoryProvisioner::new()),
            })
        }
    }
}

/// Create the handoff store selected by `handoff.backend`
pub fn create_handoff_store(config: &HandoffConfig) -> Arc<dyn HandoffStore + Send + Sync> {
    match config.backend {
        HandoffBackend::Filesystem => Arc::new(FsHandoff::new(&config.path)),
        HandoffBackend::Memory => Arc::new(InMemoryHandoff::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backends_start_empty() {
        let config = PipelineConfig::in_memory();
        let backends = create_storage_backends(&config).await.unwrap();

        assert_eq!(backends.source.count().await.unwrap(), 0);
        assert_eq!(backends.archive.count().await.unwrap(), 0);
        backends
            .provisioner
            .ensure_schema(&config.schema)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_postgresql_without_section_is_configuration_error() {
        let mut config = PipelineConfig::in_memory();
        config.storage_backend = StorageBackend::PostgreSQL;

        let result = create_storage_backends(&config).await;
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_create_handoff_store() {
        let config = HandoffConfig {
            backend: HandoffBackend::Filesystem,
            path: "/tmp/phi_intermediate_data".to_string(),
        };
        assert_eq!(
            create_handoff_store(&config).location(),
            "/tmp/phi_intermediate_data"
        );

        let config = HandoffConfig {
            backend: HandoffBackend::Memory,
            path: String::new(),
        };
        let store = create_handoff_store(&config);
        assert_eq!(store.location(), "memory");
        assert!(!store.exists().await.unwrap());
    }
}
