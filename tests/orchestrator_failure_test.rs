//! Failure handling of the orchestrator, driven by failing storage doubles

use async_trait::async_trait;
use phi_archive::adapters::handoff::{FsHandoff, HandoffStore, InMemoryHandoff};
use phi_archive::adapters::memory::{InMemoryArchive, InMemoryProvisioner, InMemorySource};
use phi_archive::adapters::storage::{ArchiveStore, SchemaProvisioner, SourceStore, StorageBackends};
use phi_archive::config::{PipelineConfig, TableSchema};
use phi_archive::domain::{ArchivalRecord, CompositeKey, PipelineError, RawRecord, Result};
use phi_archive::pipeline::{
    PipelineOrchestrator, PipelineState, RetryPolicy, RunOutcome, SequentialExecutor,
    WorkerPoolExecutor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn raw_records() -> Vec<RawRecord> {
    vec![
        RawRecord::complete("r1", "Jane Doe", "2015-03-01"),
        RawRecord::complete("r2", "John Smith", "2022-07-19"),
        RawRecord::complete("r3", "Ada Lovelace", "2018-11-30"),
        RawRecord::complete("r4", "Alan Turing", "2001-06-23"),
    ]
}

/// Source whose scans of one partition always fail
struct BrokenPartitionSource {
    inner: InMemorySource,
    broken_partition: usize,
}

#[async_trait]
impl SourceStore for BrokenPartitionSource {
    async fn scan_partition(&self, partition: usize, partitions: usize) -> Result<Vec<RawRecord>> {
        if partition == self.broken_partition {
            return Err(PipelineError::Storage("region server unavailable".to_string()));
        }
        self.inner.scan_partition(partition, partitions).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

/// Source that fails the first `failures` scans, then recovers
struct FlakySource {
    inner: InMemorySource,
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl SourceStore for FlakySource {
    async fn scan_partition(&self, partition: usize, partitions: usize) -> Result<Vec<RawRecord>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(PipelineError::Storage("connection reset".to_string()));
        }
        self.inner.scan_partition(partition, partitions).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

/// Source that counts scans
#[derive(Default)]
struct CountingSource {
    scans: AtomicUsize,
}

#[async_trait]
impl SourceStore for CountingSource {
    async fn scan_partition(&self, _partition: usize, _partitions: usize) -> Result<Vec<RawRecord>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Archive that rejects every write
struct ReadOnlyArchive;

#[async_trait]
impl ArchiveStore for ReadOnlyArchive {
    async fn upsert(&self, _record: &ArchivalRecord) -> Result<()> {
        Err(PipelineError::Storage("archive table is read-only".to_string()))
    }

    async fn get(&self, _key: &CompositeKey) -> Result<Option<ArchivalRecord>> {
        Ok(None)
    }

    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Provisioner without permission to create tables
struct DeniedProvisioner;

#[async_trait]
impl SchemaProvisioner for DeniedProvisioner {
    async fn ensure_schema(&self, schema: &TableSchema) -> Result<()> {
        Err(PipelineError::Schema(format!(
            "permission denied to create {}",
            schema.raw_table
        )))
    }
}

fn no_retry() -> Arc<SequentialExecutor> {
    Arc::new(SequentialExecutor::new(RetryPolicy::no_retry()))
}

#[tokio::test]
async fn test_stage1_failure_skips_stage2_and_keeps_handoff() {
    let temp_dir = TempDir::new().unwrap();
    let handoff = Arc::new(FsHandoff::new(temp_dir.path().join("handoff")));
    let archive = Arc::new(InMemoryArchive::new());

    let storage = StorageBackends {
        source: Arc::new(BrokenPartitionSource {
            inner: InMemorySource::from_records(raw_records()),
            broken_partition: 1,
        }),
        archive: archive.clone(),
        provisioner: Arc::new(InMemoryProvisioner::new()),
    };
    let orchestrator = PipelineOrchestrator::new(storage, handoff.clone(), no_retry())
        .with_partitions(2);

    let report = orchestrator.run().await.unwrap();

    assert!(!report.is_successful());
    assert_eq!(
        report.outcome,
        RunOutcome::Failed {
            stage: "anonymization".to_string()
        }
    );
    assert_eq!(
        report.states,
        vec![
            PipelineState::Init,
            PipelineState::Stage1Running,
            PipelineState::Stage1Failed,
            PipelineState::Done,
        ]
    );
    assert!(report.archival.is_none());
    assert!(report.handoff_retained);

    let stage1 = report.anonymization.unwrap();
    assert_eq!(stage1.succeeded_partitions, 1);
    assert_eq!(stage1.failures.len(), 1);
    assert_eq!(stage1.failures[0].partition, 1);

    // Partition 0 was written; stage 1 never completed
    assert!(handoff.exists().await.unwrap());
    assert!(!handoff.is_complete().await.unwrap());
    assert_eq!(handoff.list_partitions().await.unwrap().len(), 1);
    assert_eq!(archive.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stage2_failure_keeps_completed_handoff() {
    let handoff = Arc::new(InMemoryHandoff::new());
    let storage = StorageBackends {
        source: Arc::new(InMemorySource::from_records(raw_records())),
        archive: Arc::new(ReadOnlyArchive),
        provisioner: Arc::new(InMemoryProvisioner::new()),
    };
    let orchestrator = PipelineOrchestrator::new(
        storage,
        handoff.clone(),
        Arc::new(WorkerPoolExecutor::new(
            RetryPolicy::new(2, Duration::ZERO),
            2,
        )),
    )
    .with_partitions(2);

    let report = orchestrator.run().await.unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Failed {
            stage: "archival".to_string()
        }
    );
    assert_eq!(report.state(), PipelineState::Done);
    assert!(report.states.contains(&PipelineState::Stage1Succeeded));
    assert!(report.states.contains(&PipelineState::Stage2Failed));
    assert!(report.handoff_retained);

    let stage2 = report.archival.unwrap();
    assert_eq!(stage2.failures.len(), 2);
    assert!(stage2.failures.iter().all(|f| f.attempts == 2));

    assert!(handoff.exists().await.unwrap());
    assert!(handoff.is_complete().await.unwrap());
    assert_eq!(handoff.list_partitions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_successful_run_deletes_handoff() {
    let temp_dir = TempDir::new().unwrap();
    let handoff = Arc::new(FsHandoff::new(temp_dir.path().join("handoff")));
    let storage = StorageBackends {
        source: Arc::new(InMemorySource::from_records(raw_records())),
        archive: Arc::new(InMemoryArchive::new()),
        provisioner: Arc::new(InMemoryProvisioner::new()),
    };
    let orchestrator =
        PipelineOrchestrator::new(storage, handoff.clone(), no_retry()).with_partitions(3);

    let report = orchestrator.run().await.unwrap();

    assert!(report.is_successful());
    assert!(!handoff.exists().await.unwrap());
}

#[tokio::test]
async fn test_transient_source_failures_are_retried() {
    let archive = Arc::new(InMemoryArchive::new());
    let storage = StorageBackends {
        source: Arc::new(FlakySource {
            inner: InMemorySource::from_records(raw_records()),
            failures: 2,
            calls: AtomicUsize::new(0),
        }),
        archive: archive.clone(),
        provisioner: Arc::new(InMemoryProvisioner::new()),
    };
    let orchestrator = PipelineOrchestrator::new(
        storage,
        Arc::new(InMemoryHandoff::new()),
        Arc::new(SequentialExecutor::new(RetryPolicy::new(3, Duration::ZERO))),
    )
    .with_partitions(2);

    let report = orchestrator.run().await.unwrap();

    assert!(report.is_successful());
    assert_eq!(archive.count().await.unwrap(), 4);

    // Failed attempts contribute no counts
    let stage1 = report.anonymization.unwrap();
    assert_eq!(stage1.counters.records_read, 4);
    assert_eq!(stage1.attempts, 4);
}

#[tokio::test]
async fn test_provisioning_failure_aborts_before_any_record() {
    let source = Arc::new(CountingSource::default());
    let handoff = Arc::new(InMemoryHandoff::with_partitions([(
        0,
        "kept=\t2015-01-01\n".to_string(),
    )]));
    let storage = StorageBackends {
        source: source.clone(),
        archive: Arc::new(InMemoryArchive::new()),
        provisioner: Arc::new(DeniedProvisioner),
    };
    let orchestrator = PipelineOrchestrator::new(storage, handoff.clone(), no_retry());

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(PipelineError::Schema(_))));
    assert_eq!(source.scans.load(Ordering::SeqCst), 0);
    assert!(handoff.exists().await.unwrap());
}

#[tokio::test]
async fn test_invalid_schema_is_a_provisioning_failure() {
    let storage = StorageBackends {
        source: Arc::new(InMemorySource::new()),
        archive: Arc::new(InMemoryArchive::new()),
        provisioner: Arc::new(InMemoryProvisioner::new()),
    };
    let schema = TableSchema {
        archive_table: TableSchema::default().raw_table,
        ..TableSchema::default()
    };
    let orchestrator = PipelineOrchestrator::new(storage, Arc::new(InMemoryHandoff::new()), no_retry())
        .with_schema(schema);

    let err = orchestrator.ensure_schema().await.unwrap_err();
    assert!(err.is_environment_fault());
}

#[tokio::test]
async fn test_unknown_digest_fails_before_storage_is_opened() {
    let mut config = PipelineConfig::in_memory();
    config.pseudonymization.digest = "md5".to_string();

    let result = PipelineOrchestrator::from_config(&config).await;
    assert!(matches!(result, Err(PipelineError::DigestUnavailable(_))));
}
