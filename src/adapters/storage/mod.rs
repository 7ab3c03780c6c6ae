//! Table storage abstraction
//!
//! Trait definitions and the factory that selects an implementation.

pub mod factory;
pub mod traits;

pub use factory::{create_handoff_store, create_storage_backends, StorageBackends};
pub use traits::{ArchiveStore, SchemaProvisioner, SourceStore};
