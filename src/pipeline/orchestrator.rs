//! Pipeline orchestrator
//!
//! Runs the two stages in order around the intermediate handoff:
//!
//! ```text
//! Init -> Stage1Running -> Stage1Failed ----------------------------------> Done
//!                       -> Stage1Succeeded -> Stage2Running -> Stage2Failed -> Done
//!                                                           -> Stage2Succeeded -> Done
//! ```
//!
//! `Init` provisions the tables and clears any handoff left by an earlier
//! run. The handoff is deleted only after both stages succeeded; a failed run
//! leaves it in place for inspection or a rerun.
//!
//! Provisioning failures and failures of the handoff lifecycle operations
//! (clear, completion marker, listing, delete) are returned as `Err`. A stage
//! that does not complete is a normal, reported outcome.

use crate::adapters::handoff::HandoffStore;
use crate::adapters::storage::{create_handoff_store, create_storage_backends, StorageBackends};
use crate::config::{PipelineConfig, TableSchema};
use crate::domain::{PipelineError, Result};
use crate::pipeline::anonymize::{self, AnonymizationStage, AnonymizationTask};
use crate::pipeline::archive::{self, ArchivalStage, ArchivalTask};
use crate::pipeline::executor::{create_executor, StageExecutor};
use crate::pipeline::pseudonymizer::Pseudonymizer;
use crate::pipeline::report::{PipelineReport, StageReport};
use crate::{log_stage_complete, log_stage_start};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// States of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Stage1Running,
    Stage1Failed,
    Stage1Succeeded,
    Stage2Running,
    Stage2Failed,
    Stage2Succeeded,
    Done,
}

/// Binary result of a run, naming the stage that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Pending,
    Succeeded,
    Failed { stage: String },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Pending => write!(f, "pending"),
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::Failed { stage } => write!(f, "failed in {stage} stage"),
        }
    }
}

/// Handoff and archive state, as reported by `phi-archive status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub handoff_location: String,
    pub handoff_present: bool,
    pub handoff_complete: bool,
    pub handoff_partitions: usize,
    pub source_rows: u64,
    pub archive_rows: u64,
}

/// Sequences the anonymization and archival stages
pub struct PipelineOrchestrator {
    schema: TableSchema,
    partitions: usize,
    pseudonymizer: Pseudonymizer,
    storage: StorageBackends,
    handoff: Arc<dyn HandoffStore + Send + Sync>,
    executor: Arc<dyn StageExecutor>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with the default schema, four partitions, and
    /// the SHA-256 pseudonymizer
    pub fn new(
        storage: StorageBackends,
        handoff: Arc<dyn HandoffStore + Send + Sync>,
        executor: Arc<dyn StageExecutor>,
    ) -> Self {
        Self {
            schema: TableSchema::default(),
            partitions: 4,
            pseudonymizer: Pseudonymizer::default(),
            storage,
            handoff,
            executor,
        }
    }

    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    pub fn with_pseudonymizer(mut self, pseudonymizer: Pseudonymizer) -> Self {
        self.pseudonymizer = pseudonymizer;
        self
    }

    /// Builds every collaborator from configuration
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DigestUnavailable`] for an unsupported digest,
    /// before any storage connection is opened, or the error of the storage
    /// factory.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        let pseudonymizer = Pseudonymizer::from_config(&config.pseudonymization)?;
        let storage = create_storage_backends(config).await?;
        let handoff = create_handoff_store(&config.handoff);
        let executor = create_executor(&config.execution);

        Ok(Self::new(storage, handoff, executor)
            .with_schema(config.schema.clone())
            .with_partitions(config.execution.partitions)
            .with_pseudonymizer(pseudonymizer))
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Provisions both tables; safe to call any number of times
    pub async fn ensure_schema(&self) -> Result<()> {
        self.storage
            .provisioner
            .ensure_schema(&self.schema)
            .await
            .map_err(|e| match e {
                PipelineError::Schema(_) => e,
                other => PipelineError::Schema(other.to_string()),
            })
    }

    /// Runs the pipeline once
    ///
    /// Returns `Ok` with a failed outcome when a stage does not complete.
    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        let mut report = PipelineReport::new();
        tracing::info!(run_id = %report.run_id, handoff = %self.handoff.location(), "Pipeline run started");

        self.ensure_schema().await?;
        self.handoff.clear().await?;

        // Stage 1
        report.enter(PipelineState::Stage1Running);
        let stage1 = self.run_anonymization().await;
        let stage1_ok = stage1.is_successful();
        report.anonymization = Some(stage1);

        if !stage1_ok {
            report.enter(PipelineState::Stage1Failed);
            return Ok(self.fail(report, anonymize::STAGE_NAME, start.elapsed()));
        }

        self.handoff.mark_complete().await?;
        report.enter(PipelineState::Stage1Succeeded);

        // Stage 2 starts only after every stage-1 partition is written
        report.enter(PipelineState::Stage2Running);
        let stage2 = self.run_archival().await?;
        let stage2_ok = stage2.is_successful();
        report.archival = Some(stage2);

        if !stage2_ok {
            report.enter(PipelineState::Stage2Failed);
            return Ok(self.fail(report, archive::STAGE_NAME, start.elapsed()));
        }
        report.enter(PipelineState::Stage2Succeeded);

        self.handoff.delete().await?;
        report.handoff_retained = false;

        report.enter(PipelineState::Done);
        report.finish(RunOutcome::Succeeded, start.elapsed());
        report.log_summary();
        Ok(report)
    }

    fn fail(&self, mut report: PipelineReport, stage: &str, elapsed: Duration) -> PipelineReport {
        tracing::error!(
            run_id = %report.run_id,
            stage = stage,
            handoff = %self.handoff.location(),
            "Stage failed; intermediate handoff retained"
        );
        report.handoff_retained = true;
        report.enter(PipelineState::Done);
        report.finish(
            RunOutcome::Failed {
                stage: stage.to_string(),
            },
            elapsed,
        );
        report.log_summary();
        report
    }

    async fn run_anonymization(&self) -> StageReport {
        log_stage_start!(anonymize::STAGE_NAME, self.partitions);
        let task = Arc::new(AnonymizationTask::new(
            AnonymizationStage::new(self.pseudonymizer),
            self.storage.source.clone(),
            self.handoff.clone(),
            self.partitions,
        ));

        let report = self
            .executor
            .execute(anonymize::STAGE_NAME, (0..self.partitions).collect(), task)
            .await;
        log_stage_complete!(
            anonymize::STAGE_NAME,
            report.is_successful(),
            Duration::from_millis(report.duration_ms)
        );
        report
    }

    async fn run_archival(&self) -> Result<StageReport> {
        let partitions: Vec<usize> = self
            .handoff
            .list_partitions()
            .await?
            .into_iter()
            .map(|partition| partition.index)
            .collect();

        // Every stage-1 partition must still be present
        if !partitions.iter().copied().eq(0..self.partitions) {
            return Err(PipelineError::Handoff(format!(
                "expected {} partitions from stage 1 in {}, found {:?}",
                self.partitions,
                self.handoff.location(),
                partitions
            )));
        }

        log_stage_start!(archive::STAGE_NAME, partitions.len());
        let task = Arc::new(ArchivalTask::new(
            ArchivalStage::new(),
            self.handoff.clone(),
            self.storage.archive.clone(),
        ));

        let report = self
            .executor
            .execute(archive::STAGE_NAME, partitions, task)
            .await;
        log_stage_complete!(
            archive::STAGE_NAME,
            report.is_successful(),
            Duration::from_millis(report.duration_ms)
        );
        Ok(report)
    }

    /// Reports the handoff and table state without changing anything
    pub async fn status(&self) -> Result<PipelineStatus> {
        let handoff_present = self.handoff.exists().await?;
        let (handoff_complete, handoff_partitions) = if handoff_present {
            (
                self.handoff.is_complete().await?,
                self.handoff.list_partitions().await?.len(),
            )
        } else {
            (false, 0)
        };

        Ok(PipelineStatus {
            handoff_location: self.handoff.location(),
            handoff_present,
            handoff_complete,
            handoff_partitions,
            source_rows: self.storage.source.count().await?,
            archive_rows: self.storage.archive.count().await?,
        })
    }
}
