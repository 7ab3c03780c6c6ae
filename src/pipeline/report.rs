//! Stage and run reports
//!
//! Reports are plain data: the CLI prints them as JSON or logs them through
//! [`PipelineReport::log_summary`].

use crate::pipeline::counters::StageCounters;
use crate::pipeline::orchestrator::{PipelineState, RunOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// A partition that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFailure {
    pub partition: usize,
    pub attempts: usize,
    pub error: String,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,

    /// Partitions submitted
    pub partitions: usize,

    /// Partitions that eventually succeeded
    pub succeeded_partitions: usize,

    /// Attempts across all partitions, retries included
    pub attempts: usize,

    /// Partitions that failed every attempt
    pub failures: Vec<PartitionFailure>,

    /// Counts merged from the successful attempt of each partition
    pub counters: StageCounters,

    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(stage: impl Into<String>, partitions: usize) -> Self {
        Self {
            stage: stage.into(),
            partitions,
            succeeded_partitions: 0,
            attempts: 0,
            failures: Vec::new(),
            counters: StageCounters::new(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn add_failure(&mut self, failure: PartitionFailure) {
        self.failures.push(failure);
    }

    /// A stage succeeds only if every partition succeeded
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty() && self.succeeded_partitions == self.partitions
    }

    pub fn log_summary(&self) {
        tracing::info!(
            stage = %self.stage,
            partitions = self.partitions,
            succeeded_partitions = self.succeeded_partitions,
            attempts = self.attempts,
            duration_ms = self.duration_ms,
            "Stage report"
        );
        self.counters.log_summary(&self.stage);

        for failure in &self.failures {
            tracing::warn!(
                stage = %self.stage,
                partition = failure.partition,
                attempts = failure.attempts,
                error = %failure.error,
                "Partition failed"
            );
        }
    }
}

/// Outcome of a whole pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// States visited, in order
    pub states: Vec<PipelineState>,

    pub outcome: RunOutcome,

    pub anonymization: Option<StageReport>,
    pub archival: Option<StageReport>,

    /// Whether the intermediate handoff was left in place
    pub handoff_retained: bool,

    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            states: vec![PipelineState::Init],
            outcome: RunOutcome::Pending,
            anonymization: None,
            archival: None,
            handoff_retained: true,
            duration_ms: 0,
        }
    }

    pub fn enter(&mut self, state: PipelineState) {
        tracing::debug!(run_id = %self.run_id, state = ?state, "Pipeline state");
        self.states.push(state);
    }

    pub fn state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Init)
    }

    /// Stamps the finish time and duration
    pub fn finish(&mut self, outcome: RunOutcome, duration: Duration) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
        self.duration_ms = duration.as_millis() as u64;
    }

    pub fn is_successful(&self) -> bool {
        self.outcome == RunOutcome::Succeeded
    }

    /// Counts of both stages combined
    pub fn counters(&self) -> StageCounters {
        let mut total = StageCounters::new();
        for stage in [&self.anonymization, &self.archival].into_iter().flatten() {
            total.merge(&stage.counters);
        }
        total
    }

    pub fn log_summary(&self) {
        let counters = self.counters();
        tracing::info!(
            run_id = %self.run_id,
            outcome = %self.outcome,
            missing_data = counters.missing_data,
            records_anonymized = counters.records_anonymized,
            invalid_record = counters.invalid_record,
            records_archived = counters.records_archived,
            handoff_retained = self.handoff_retained,
            duration_ms = self.duration_ms,
            "Pipeline run finished"
        );

        for stage in [&self.anonymization, &self.archival].into_iter().flatten() {
            stage.log_summary();
        }
    }
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self::new()
    }
}
