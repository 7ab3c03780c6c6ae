//! Archival stage: handoff lines to retention-tagged archive rows
//!
//! Every handoff line must split on the tab character into exactly two
//! fields; any other line is counted as `invalid_record` and skipped. Writes
//! are upserts at the composite key, so re-running a partition converges to
//! the same archive state.

use crate::adapters::handoff::{HandoffPartition, HandoffStore};
use crate::adapters::storage::ArchiveStore;
use crate::domain::records::HANDOFF_RECORD_SEPARATOR;
use crate::domain::{ArchivalRecord, IntermediateRecord, Result};
use crate::pipeline::counters::StageCounters;
use crate::pipeline::executor::PartitionTask;
use async_trait::async_trait;
use std::sync::Arc;

/// Stage name used in logs and reports
pub const STAGE_NAME: &str = "archival";

/// Transforms one handoff line, or returns `None` if it is malformed
///
/// # Examples
///
/// ```
/// use phi_archive::domain::RetentionTag;
/// use phi_archive::pipeline::archive::archive_line;
///
/// let record = archive_line("abc=\t2015-03-01").unwrap();
/// assert_eq!(record.composite_key.as_str(), "abc=_2015-03-01");
/// assert_eq!(record.retention_tag, RetentionTag::LongTerm);
///
/// assert!(archive_line("no-tab-here").is_none());
/// ```
pub fn archive_line(line: &str) -> Option<ArchivalRecord> {
    IntermediateRecord::parse_line(line).map(|record| ArchivalRecord::from_intermediate(&record))
}

/// Splits handoff text into lines
///
/// The final line may omit its terminator. No other normalization happens,
/// so a carriage return stays part of the visit date.
pub fn handoff_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_terminator(HANDOFF_RECORD_SEPARATOR)
}

/// The archival stage
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchivalStage;

impl ArchivalStage {
    pub fn new() -> Self {
        Self
    }

    /// Transforms a batch of handoff lines, updating `counters`
    pub fn process<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
        counters: &mut StageCounters,
    ) -> Vec<ArchivalRecord> {
        let mut output = Vec::new();
        for line in lines {
            counters.lines_read += 1;
            match archive_line(line) {
                Some(record) => {
                    counters.records_archived += 1;
                    output.push(record);
                }
                None => counters.invalid_record += 1,
            }
        }
        output
    }
}

/// One archival task per handoff partition
pub struct ArchivalTask {
    stage: ArchivalStage,
    handoff: Arc<dyn HandoffStore + Send + Sync>,
    archive: Arc<dyn ArchiveStore + Send + Sync>,
}

impl ArchivalTask {
    pub fn new(
        stage: ArchivalStage,
        handoff: Arc<dyn HandoffStore + Send + Sync>,
        archive: Arc<dyn ArchiveStore + Send + Sync>,
    ) -> Self {
        Self {
            stage,
            handoff,
            archive,
        }
    }
}

#[async_trait]
impl PartitionTask for ArchivalTask {
    async fn run(&self, partition: usize) -> Result<StageCounters> {
        let text = self
            .handoff
            .read_partition(&HandoffPartition::new(partition))
            .await?;

        let mut counters = StageCounters::new();
        let records = self.stage.process(handoff_lines(&text), &mut counters);
        if counters.invalid_record > 0 {
            tracing::warn!(
                partition,
                invalid_record = counters.invalid_record,
                "Skipped malformed handoff lines"
            );
        }

        for record in &records {
            self.archive.upsert(record).await?;
        }
        Ok(counters)
    }
}
