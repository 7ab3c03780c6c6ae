//! Filesystem handoff
//!
//! Layout under the handoff directory:
//!
//! ```text
//! part-r-00000
//! part-r-00001
//! ...
//! _SUCCESS
//! ```
//!
//! Partitions are written to a hidden temporary file and renamed into place,
//! so a reader never observes a partially written partition and a re-executed
//! task replaces its earlier output.

use super::{HandoffPartition, HandoffStore, COMPLETION_MARKER};
use crate::domain::{PipelineError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Handoff stored as a directory of partition files
pub struct FsHandoff {
    root: PathBuf,
}

impl FsHandoff {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_path(&self, partition: &HandoffPartition) -> PathBuf {
        self.root.join(partition.name())
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> PipelineError {
        PipelineError::Handoff(format!(
            "Failed to {} {}: {}",
            action,
            self.root.display(),
            error
        ))
    }
}

#[async_trait]
impl HandoffStore for FsHandoff {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn clear(&self) -> Result<()> {
        self.delete().await
    }

    async fn exists(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.root)
            .await
            .map_err(|e| self.io_error("inspect", e))
    }

    async fn write_partition(&self, index: usize, contents: String) -> Result<()> {
        let partition = HandoffPartition::new(index);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| self.io_error("create", e))?;

        let final_path = self.partition_path(&partition);
        let temp_path = self.root.join(format!(".{}.tmp", partition.name()));

        tokio::fs::write(&temp_path, contents.as_bytes())
            .await
            .map_err(|e| self.io_error("write partition in", e))?;
        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| self.io_error("publish partition in", e))?;

        tracing::debug!(partition = %partition, bytes = contents.len(), "Wrote handoff partition");
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<HandoffPartition>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::Handoff(format!(
                    "No intermediate handoff at {}",
                    self.root.display()
                )))
            }
            Err(e) => return Err(self.io_error("list", e)),
        };

        let mut partitions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error("list", e))?
        {
            if let Some(partition) = entry
                .file_name()
                .to_str()
                .and_then(HandoffPartition::parse_name)
            {
                partitions.push(partition);
            }
        }
        partitions.sort();
        Ok(partitions)
    }

    async fn read_partition(&self, partition: &HandoffPartition) -> Result<String> {
        let path = self.partition_path(partition);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            PipelineError::Handoff(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn mark_complete(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| self.io_error("create", e))?;
        tokio::fs::write(self.root.join(COMPLETION_MARKER), b"")
            .await
            .map_err(|e| self.io_error("mark complete", e))
    }

    async fn is_complete(&self) -> Result<bool> {
        tokio::fs::try_exists(self.root.join(COMPLETION_MARKER))
            .await
            .map_err(|e| self.io_error("inspect", e))
    }

    async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                tracing::debug!(path = %self.root.display(), "Removed intermediate handoff");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }
}
