//! Record models for the two pipeline stages
//!
//! - [`RawRecord`]: a row of the source table, holding PHI
//! - [`IntermediateRecord`]: the de-identified handoff unit between stages
//! - [`ArchivalRecord`]: the retention-tagged row written to the archive
//!
//! Each transform builds a fresh value; no record is mutated after creation.

use super::ids::{AnonymizedId, CompositeKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field separator of the intermediate handoff format
///
/// Fields are neither quoted nor escaped, so a tab or newline inside a visit
/// date corrupts the line it belongs to.
pub const HANDOFF_FIELD_SEPARATOR: char = '\t';

/// Record separator of the intermediate handoff format
pub const HANDOFF_RECORD_SEPARATOR: char = '\n';

/// Visit dates starting with this literal text are retained long term
pub const LONG_TERM_PREFIX: &str = "201";

/// One row of the source table
///
/// Either required column may be absent. An empty string counts as present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Opaque source row key
    pub row_key: String,

    /// Patient name (PHI)
    #[serde(default)]
    pub patient_name: Option<String>,

    /// Visit date in its textual source form, e.g. `YYYY-MM-DD`
    #[serde(default)]
    pub visit_date: Option<String>,
}

impl RawRecord {
    /// Creates a raw record
    pub fn new(
        row_key: impl Into<String>,
        patient_name: Option<String>,
        visit_date: Option<String>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            patient_name,
            visit_date,
        }
    }

    /// Creates a raw record with both required columns present
    pub fn complete(
        row_key: impl Into<String>,
        patient_name: impl Into<String>,
        visit_date: impl Into<String>,
    ) -> Self {
        Self::new(row_key, Some(patient_name.into()), Some(visit_date.into()))
    }

    /// Whether both required columns are present
    pub fn is_transformable(&self) -> bool {
        self.patient_name.is_some() && self.visit_date.is_some()
    }
}

// Keeps patient names out of logs and panic messages
impl fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRecord")
            .field("row_key", &self.row_key)
            .field(
                "patient_name",
                &self.patient_name.as_ref().map(|_| "[REDACTED]"),
            )
            .field("visit_date", &self.visit_date)
            .finish()
    }
}

/// De-identified record handed from the anonymization stage to the archival stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntermediateRecord {
    /// Pseudonymized patient identifier
    pub anonymized_id: AnonymizedId,

    /// Visit date, carried through unchanged
    pub visit_date: String,
}

impl IntermediateRecord {
    /// Creates an intermediate record
    pub fn new(anonymized_id: AnonymizedId, visit_date: impl Into<String>) -> Self {
        Self {
            anonymized_id,
            visit_date: visit_date.into(),
        }
    }

    /// Encodes the record as one handoff line, without the line terminator
    pub fn to_line(&self) -> String {
        let mut line =
            String::with_capacity(self.anonymized_id.as_str().len() + 1 + self.visit_date.len());
        line.push_str(self.anonymized_id.as_str());
        line.push(HANDOFF_FIELD_SEPARATOR);
        line.push_str(&self.visit_date);
        line
    }

    /// Decodes one handoff line
    ///
    /// The line must split on the tab character into exactly two fields.
    /// Either field may be empty. Returns `None` for any other shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use phi_archive::domain::IntermediateRecord;
    ///
    /// let record = IntermediateRecord::parse_line("abc=\t2015-03-01").unwrap();
    /// assert_eq!(record.visit_date, "2015-03-01");
    ///
    /// assert!(IntermediateRecord::parse_line("abc=").is_none());
    /// assert!(IntermediateRecord::parse_line("a\tb\tc").is_none());
    /// ```
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split(HANDOFF_FIELD_SEPARATOR);
        let anonymized_id = fields.next()?;
        let visit_date = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(
            AnonymizedId::from(anonymized_id.to_string()),
            visit_date,
        ))
    }
}

/// Retention classification attached to every archival record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetentionTag {
    /// Visit date begins with `"201"`
    #[serde(rename = "RET_GROUP_A_LONG_TERM")]
    LongTerm,

    /// Everything else
    #[serde(rename = "RET_GROUP_B_STANDARD")]
    Standard,
}

impl RetentionTag {
    /// Classifies a visit date by its literal text prefix
    ///
    /// This is a prefix test, not a date comparison: `"1999-01-01"` is
    /// standard and `"201"` alone is long term.
    ///
    /// # Examples
    ///
    /// ```
    /// use phi_archive::domain::RetentionTag;
    ///
    /// assert_eq!(RetentionTag::classify("2015-03-01"), RetentionTag::LongTerm);
    /// assert_eq!(RetentionTag::classify("2022-07-19"), RetentionTag::Standard);
    /// ```
    pub fn classify(visit_date: &str) -> Self {
        if visit_date.starts_with(LONG_TERM_PREFIX) {
            RetentionTag::LongTerm
        } else {
            RetentionTag::Standard
        }
    }

    /// The label stored in the archive
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionTag::LongTerm => "RET_GROUP_A_LONG_TERM",
            RetentionTag::Standard => "RET_GROUP_B_STANDARD",
        }
    }
}

impl fmt::Display for RetentionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RET_GROUP_A_LONG_TERM" => Ok(RetentionTag::LongTerm),
            "RET_GROUP_B_STANDARD" => Ok(RetentionTag::Standard),
            other => Err(format!("Unknown retention tag: {other}")),
        }
    }
}

/// Final record written to the archive table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivalRecord {
    /// Archive row key
    pub composite_key: CompositeKey,

    /// Visit date, stored in the anonymized-data family
    pub visit_date: String,

    /// Retention classification, stored in the metadata family
    pub retention_tag: RetentionTag,
}

impl ArchivalRecord {
    /// Builds the archival record for an intermediate record
    pub fn from_intermediate(record: &IntermediateRecord) -> Self {
        Self {
            composite_key: CompositeKey::compose(&record.anonymized_id, &record.visit_date),
            visit_date: record.visit_date.clone(),
            retention_tag: RetentionTag::classify(&record.visit_date),
        }
    }
}
