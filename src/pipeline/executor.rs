//! Stage execution: "submit stage, await completion"
//!
//! A stage is a set of independent partition tasks. An executor runs every
//! partition, retrying a failed one up to `max_attempts` times, and reports
//! the stage as successful only if every partition eventually succeeded.
//! A retried task may already have written part of its output, so tasks must
//! be idempotent. Only the counters of the attempt that succeeded are kept.

use crate::config::schema::{ExecutionConfig, ExecutorKind};
use crate::domain::Result;
use crate::log_retry_attempt;
use crate::pipeline::counters::StageCounters;
use crate::pipeline::report::{PartitionFailure, StageReport};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Work for one partition of a stage
#[async_trait]
pub trait PartitionTask: Send + Sync {
    /// Process `partition` and return its counts
    async fn run(&self, partition: usize) -> Result<StageCounters>;
}

/// Runs every partition of a stage to completion
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(
        &self,
        stage: &str,
        partitions: Vec<usize>,
        task: Arc<dyn PartitionTask>,
    ) -> StageReport;
}

/// Attempts per partition and the pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(500))
    }
}

enum PartitionOutcome {
    Succeeded {
        attempts: usize,
        counters: StageCounters,
    },
    Failed(PartitionFailure),
}

async fn run_with_retry(
    stage: &str,
    partition: usize,
    task: &dyn PartitionTask,
    policy: RetryPolicy,
) -> PartitionOutcome {
    let mut attempt = 1;
    loop {
        match task.run(partition).await {
            Ok(counters) => {
                return PartitionOutcome::Succeeded {
                    attempts: attempt,
                    counters,
                }
            }
            Err(e) if attempt < policy.max_attempts => {
                log_retry_attempt!(stage, partition, attempt + 1, policy.max_attempts, e);
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    stage = %stage,
                    partition,
                    attempts = attempt,
                    error = %e,
                    "Partition failed after final attempt"
                );
                return PartitionOutcome::Failed(PartitionFailure {
                    partition,
                    attempts: attempt,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn record_outcome(report: &mut StageReport, outcome: PartitionOutcome) {
    match outcome {
        PartitionOutcome::Succeeded { attempts, counters } => {
            report.succeeded_partitions += 1;
            report.attempts += attempts;
            report.counters.merge(&counters);
        }
        PartitionOutcome::Failed(failure) => {
            report.attempts += failure.attempts;
            report.add_failure(failure);
        }
    }
}

/// Runs partitions one after another on the calling task
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor {
    policy: RetryPolicy,
}

impl SequentialExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl StageExecutor for SequentialExecutor {
    async fn execute(
        &self,
        stage: &str,
        partitions: Vec<usize>,
        task: Arc<dyn PartitionTask>,
    ) -> StageReport {
        let start = Instant::now();
        let mut report = StageReport::new(stage, partitions.len());

        for partition in partitions {
            let outcome = run_with_retry(stage, partition, task.as_ref(), self.policy).await;
            record_outcome(&mut report, outcome);
        }

        report.with_duration(start.elapsed())
    }
}

/// Runs partitions as tokio tasks, at most `max_concurrency` at a time
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolExecutor {
    policy: RetryPolicy,
    max_concurrency: usize,
}

impl WorkerPoolExecutor {
    pub fn new(policy: RetryPolicy, max_concurrency: usize) -> Self {
        Self {
            policy,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

#[async_trait]
impl StageExecutor for WorkerPoolExecutor {
    async fn execute(
        &self,
        stage: &str,
        partitions: Vec<usize>,
        task: Arc<dyn PartitionTask>,
    ) -> StageReport {
        let start = Instant::now();
        let mut report = StageReport::new(stage, partitions.len());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = FuturesUnordered::new();

        for partition in partitions {
            let semaphore = semaphore.clone();
            let task = task.clone();
            let stage_name = stage.to_string();
            let policy = self.policy;

            let worker = tokio::spawn(async move {
                // The semaphore is never closed, so acquire cannot fail here
                let _permit = semaphore.acquire_owned().await.ok();
                run_with_retry(&stage_name, partition, task.as_ref(), policy).await
            });
            workers.push(worker.map(move |joined| (partition, joined)));
        }

        while let Some((partition, joined)) = workers.next().await {
            match joined {
                Ok(outcome) => record_outcome(&mut report, outcome),
                // Only reachable when panics unwind; the release profile aborts
                Err(e) => {
                    tracing::error!(stage = %stage, partition, error = %e, "Partition worker panicked");
                    report.add_failure(PartitionFailure {
                        partition,
                        attempts: 1,
                        error: format!("worker panicked: {e}"),
                    });
                }
            }
        }

        report.with_duration(start.elapsed())
    }
}

/// Builds the executor named by the configuration
pub fn create_executor(config: &ExecutionConfig) -> Arc<dyn StageExecutor> {
    let policy = RetryPolicy::new(
        config.max_attempts,
        Duration::from_millis(config.retry_backoff_ms),
    );
    match config.executor {
        ExecutorKind::Sequential => Arc::new(SequentialExecutor::new(policy)),
        ExecutorKind::WorkerPool => {
            Arc::new(WorkerPoolExecutor::new(policy, config.max_concurrency))
        }
    }
}
