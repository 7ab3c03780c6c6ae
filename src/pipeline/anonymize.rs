//! Anonymization stage: raw records to intermediate handoff lines
//!
//! Each raw record is transformed on its own. A record without a patient
//! name or visit date is counted as `missing_data` and dropped; every other
//! record yields one [`IntermediateRecord`]. Partitions are independent, so
//! the stage can run them in any order, in parallel, and more than once.

use crate::adapters::handoff::HandoffStore;
use crate::adapters::storage::SourceStore;
use crate::domain::records::HANDOFF_RECORD_SEPARATOR;
use crate::domain::{IntermediateRecord, RawRecord, Result};
use crate::pipeline::counters::StageCounters;
use crate::pipeline::executor::PartitionTask;
use crate::pipeline::pseudonymizer::Pseudonymizer;
use async_trait::async_trait;
use std::sync::Arc;

/// Stage name used in logs and reports
pub const STAGE_NAME: &str = "anonymization";

/// Transforms one raw record, or returns `None` if a required column is absent
///
/// The visit date is passed through verbatim.
pub fn anonymize_record(pseudonymizer: &Pseudonymizer, record: &RawRecord) -> Option<IntermediateRecord> {
    let name = record.patient_name.as_deref()?;
    let visit_date = record.visit_date.as_deref()?;
    Some(IntermediateRecord::new(
        pseudonymizer.pseudonymize(name),
        visit_date,
    ))
}

/// Renders intermediate records as handoff text, one terminated line each
pub fn render_handoff(records: &[IntermediateRecord]) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(&record.to_line());
        text.push(HANDOFF_RECORD_SEPARATOR);
    }
    text
}

/// The anonymization stage
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymizationStage {
    pseudonymizer: Pseudonymizer,
}

impl AnonymizationStage {
    pub fn new(pseudonymizer: Pseudonymizer) -> Self {
        Self { pseudonymizer }
    }

    /// Transforms a batch of raw records, updating `counters`
    pub fn process<'a>(
        &self,
        records: impl IntoIterator<Item = &'a RawRecord>,
        counters: &mut StageCounters,
    ) -> Vec<IntermediateRecord> {
        let mut output = Vec::new();
        for record in records {
            counters.records_read += 1;
            match anonymize_record(&self.pseudonymizer, record) {
                Some(intermediate) => {
                    counters.records_anonymized += 1;
                    output.push(intermediate);
                }
                None => {
                    tracing::debug!(row_key = %record.row_key, "Skipping record with missing data");
                    counters.missing_data += 1;
                }
            }
        }
        output
    }
}

/// One anonymization task per source partition
///
/// Reads the partition, transforms it, and replaces the matching handoff
/// partition. Counts are only returned once the handoff write succeeded.
pub struct AnonymizationTask {
    stage: AnonymizationStage,
    source: Arc<dyn SourceStore + Send + Sync>,
    handoff: Arc<dyn HandoffStore + Send + Sync>,
    partitions: usize,
}

impl AnonymizationTask {
    pub fn new(
        stage: AnonymizationStage,
        source: Arc<dyn SourceStore + Send + Sync>,
        handoff: Arc<dyn HandoffStore + Send + Sync>,
        partitions: usize,
    ) -> Self {
        Self {
            stage,
            source,
            handoff,
            partitions,
        }
    }
}

#[async_trait]
impl PartitionTask for AnonymizationTask {
    async fn run(&self, partition: usize) -> Result<StageCounters> {
        let records = self.source.scan_partition(partition, self.partitions).await?;

        let mut counters = StageCounters::new();
        let output = self.stage.process(&records, &mut counters);

        self.handoff
            .write_partition(partition, render_handoff(&output))
            .await?;
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::handoff::{HandoffPartition, InMemoryHandoff};
    use crate::adapters::memory::InMemorySource;
    use crate::domain::AnonymizedId;

    const JANE_DOE_ID: &str = "ATMsh2UYp5O3wbjfr21LQE/12wmyHGYnyllxDMJPaWo=";

    #[test]
    fn test_anonymize_record_passes_visit_date_through() {
        let record = RawRecord::complete("row-1", "Jane Doe", "2015-03-01");
        let intermediate = anonymize_record(&Pseudonymizer::default(), &record).unwrap();

        assert_eq!(intermediate.anonymized_id.as_str(), JANE_DOE_ID);
        assert_eq!(intermediate.visit_date, "2015-03-01");
    }

    #[test]
    fn test_anonymize_record_missing_columns() {
        let pseudonymizer = Pseudonymizer::default();
        let no_name = RawRecord::new("r1", None, Some("2015-03-01".to_string()));
        let no_date = RawRecord::new("r2", Some("Jane Doe".to_string()), None);
        let neither = RawRecord::new("r3", None, None);

        assert!(anonymize_record(&pseudonymizer, &no_name).is_none());
        assert!(anonymize_record(&pseudonymizer, &no_date).is_none());
        assert!(anonymize_record(&pseudonymizer, &neither).is_none());
    }

    #[test]
    fn test_empty_values_are_present() {
        let record = RawRecord::complete("r1", "", "");
        let intermediate = anonymize_record(&Pseudonymizer::default(), &record).unwrap();
        assert_eq!(intermediate.visit_date, "");
        assert_eq!(intermediate.to_line(), format!("{}\t", intermediate.anonymized_id));
    }

    #[test]
    fn test_process_counts_each_skip_once() {
        let stage = AnonymizationStage::default();
        let records = vec![
            RawRecord::complete("r1", "Jane Doe", "2015-03-01"),
            RawRecord::new("r2", None, Some("2016-01-01".to_string())),
            RawRecord::complete("r3", "John Smith", "2022-07-19"),
            RawRecord::new("r4", Some("No Date".to_string()), None),
        ];

        let mut counters = StageCounters::new();
        let output = stage.process(&records, &mut counters);

        assert_eq!(output.len(), 2);
        assert_eq!(counters.records_read, 4);
        assert_eq!(counters.missing_data, 2);
        assert_eq!(counters.records_anonymized, 2);
        assert_eq!(counters.invalid_record, 0);
    }

    #[test]
    fn test_render_handoff() {
        let records = vec![
            IntermediateRecord::new(AnonymizedId::from("a=".to_string()), "2015"),
            IntermediateRecord::new(AnonymizedId::from("b=".to_string()), "2022"),
        ];
        assert_eq!(render_handoff(&records), "a=\t2015\nb=\t2022\n");
        assert_eq!(render_handoff(&[]), "");
    }

    #[tokio::test]
    async fn test_task_writes_partition_and_is_repeatable() {
        let source = Arc::new(InMemorySource::from_records([
            RawRecord::complete("r1", "Jane Doe", "2015-03-01"),
            RawRecord::complete("r2", "John Smith", "2022-07-19"),
            RawRecord::new("r3", None, None),
        ]));
        let handoff = Arc::new(InMemoryHandoff::new());
        let task = AnonymizationTask::new(
            AnonymizationStage::default(),
            source,
            handoff.clone(),
            1,
        );

        let first = task.run(0).await.unwrap();
        let text = handoff.read_partition(&HandoffPartition::new(0)).await.unwrap();
        let second = task.run(0).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.records_anonymized, 2);
        assert_eq!(first.missing_data, 1);
        assert_eq!(
            handoff.read_partition(&HandoffPartition::new(0)).await.unwrap(),
            text
        );
        assert!(text.starts_with(&format!("{JANE_DOE_ID}\t2015-03-01\n")));
    }
}
