//! Domain models and types for the pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Records** ([`RawRecord`], [`IntermediateRecord`], [`ArchivalRecord`])
//! - **Identifiers** ([`AnonymizedId`], [`CompositeKey`])
//! - **Retention classification** ([`RetentionTag`])
//! - **Error types** ([`PipelineError`]) and the [`Result`] alias
//!
//! # Record Flow
//!
//! ```rust
//! use phi_archive::domain::{
//!     AnonymizedId, ArchivalRecord, IntermediateRecord, RetentionTag,
//! };
//!
//! let intermediate = IntermediateRecord::new(
//!     AnonymizedId::from("abc=".to_string()),
//!     "2015-03-01",
//! );
//! let archival = ArchivalRecord::from_intermediate(&intermediate);
//!
//! assert_eq!(archival.composite_key.as_str(), "abc=_2015-03-01");
//! assert_eq!(archival.retention_tag, RetentionTag::LongTerm);
//! ```

pub mod errors;
pub mod ids;
pub mod records;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::PipelineError;
pub use ids::{AnonymizedId, CompositeKey};
pub use records::{ArchivalRecord, IntermediateRecord, RawRecord, RetentionTag};
pub use result::Result;
