//! Per-run record counters
//!
//! Counters only grow and merge by addition, so the totals of partitions
//! processed on different workers can be combined in any order.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Record counts of one partition, one stage, or a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    /// Raw records read by the anonymization stage
    pub records_read: u64,

    /// Raw records skipped because a required column was absent
    pub missing_data: u64,

    /// Intermediate records emitted by the anonymization stage
    pub records_anonymized: u64,

    /// Handoff lines read by the archival stage
    pub lines_read: u64,

    /// Handoff lines skipped because they did not split into two fields
    pub invalid_record: u64,

    /// Archival records written
    pub records_archived: u64,
}

impl StageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another set of counts into this one
    pub fn merge(&mut self, other: &StageCounters) {
        self.records_read += other.records_read;
        self.missing_data += other.missing_data;
        self.records_anonymized += other.records_anonymized;
        self.lines_read += other.lines_read;
        self.invalid_record += other.invalid_record;
        self.records_archived += other.records_archived;
    }

    /// Records that were counted but produced no output
    pub fn skipped(&self) -> u64 {
        self.missing_data + self.invalid_record
    }

    pub fn log_summary(&self, stage: &str) {
        tracing::info!(
            stage = stage,
            records_read = self.records_read,
            missing_data = self.missing_data,
            records_anonymized = self.records_anonymized,
            lines_read = self.lines_read,
            invalid_record = self.invalid_record,
            records_archived = self.records_archived,
            "Stage counters"
        );
    }
}

impl AddAssign<&StageCounters> for StageCounters {
    fn add_assign(&mut self, rhs: &StageCounters) {
        self.merge(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_additive() {
        let mut total = StageCounters::new();
        let a = StageCounters {
            records_read: 3,
            missing_data: 1,
            records_anonymized: 2,
            ..Default::default()
        };
        let b = StageCounters {
            lines_read: 5,
            invalid_record: 2,
            records_archived: 3,
            ..Default::default()
        };

        total.merge(&a);
        total += &b;
        total += &a;

        assert_eq!(total.records_read, 6);
        assert_eq!(total.missing_data, 2);
        assert_eq!(total.records_anonymized, 4);
        assert_eq!(total.lines_read, 5);
        assert_eq!(total.invalid_record, 2);
        assert_eq!(total.records_archived, 3);
        assert_eq!(total.skipped(), 4);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let parts = [
            StageCounters { missing_data: 1, ..Default::default() },
            StageCounters { records_anonymized: 7, ..Default::default() },
            StageCounters { records_archived: 2, ..Default::default() },
        ];

        let mut forward = StageCounters::new();
        parts.iter().for_each(|c| forward.merge(c));
        let mut backward = StageCounters::new();
        parts.iter().rev().for_each(|c| backward.merge(c));

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_serialize_field_names() {
        let json = serde_json::to_value(StageCounters::new()).unwrap();
        assert_eq!(json["missing_data"], 0);
        assert_eq!(json["records_archived"], 0);
    }
}
