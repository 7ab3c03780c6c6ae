//! In-process handoff

use super::{HandoffPartition, HandoffStore};
use crate::domain::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct HandoffState {
    partitions: BTreeMap<usize, String>,
    complete: bool,
}

/// Handoff kept in memory; `None` means no handoff is present
#[derive(Default)]
pub struct InMemoryHandoff {
    state: RwLock<Option<HandoffState>>,
}

impl InMemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a handoff that already holds the given partitions, as if a
    /// previous run had left them behind
    pub fn with_partitions(partitions: impl IntoIterator<Item = (usize, String)>) -> Self {
        Self {
            state: RwLock::new(Some(HandoffState {
                partitions: partitions.into_iter().collect(),
                complete: false,
            })),
        }
    }
}

#[async_trait]
impl HandoffStore for InMemoryHandoff {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn clear(&self) -> Result<()> {
        *self.state.write().await = None;
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state.read().await.is_some())
    }

    async fn write_partition(&self, index: usize, contents: String) -> Result<()> {
        self.state
            .write()
            .await
            .get_or_insert_with(HandoffState::default)
            .partitions
            .insert(index, contents);
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<HandoffPartition>> {
        match self.state.read().await.as_ref() {
            Some(state) => Ok(state
                .partitions
                .keys()
                .map(|&index| HandoffPartition::new(index))
                .collect()),
            None => Err(PipelineError::Handoff(
                "No intermediate handoff in memory".to_string(),
            )),
        }
    }

    async fn read_partition(&self, partition: &HandoffPartition) -> Result<String> {
        self.state
            .read()
            .await
            .as_ref()
            .and_then(|state| state.partitions.get(&partition.index).cloned())
            .ok_or_else(|| PipelineError::Handoff(format!("Missing partition {partition}")))
    }

    async fn mark_complete(&self) -> Result<()> {
        self.state
            .write()
            .await
            .get_or_insert_with(HandoffState::default)
            .complete = true;
        Ok(())
    }

    async fn is_complete(&self) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .as_ref()
            .map(|state| state.complete)
            .unwrap_or(false))
    }

    async fn delete(&self) -> Result<()> {
        self.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle() {
        let handoff = InMemoryHandoff::new();
        assert!(!handoff.exists().await.unwrap());
        assert!(handoff.list_partitions().await.is_err());

        handoff.write_partition(2, "c\t2015\n".to_string()).await.unwrap();
        handoff.write_partition(0, "a\t2015\n".to_string()).await.unwrap();
        handoff.mark_complete().await.unwrap();

        let partitions = handoff.list_partitions().await.unwrap();
        assert_eq!(partitions, vec![HandoffPartition::new(0), HandoffPartition::new(2)]);
        assert!(handoff.is_complete().await.unwrap());

        handoff.delete().await.unwrap();
        assert!(!handoff.exists().await.unwrap());
        assert!(!handoff.is_complete().await.unwrap());
    }

    #[tokio::test]
    async fn test_with_partitions_is_stale_and_incomplete() {
        let handoff = InMemoryHandoff::with_partitions([(0, "stale\t2015\n".to_string())]);
        assert!(handoff.exists().await.unwrap());
        assert!(!handoff.is_complete().await.unwrap());
        assert_eq!(
            handoff
                .read_partition(&HandoffPartition::new(0))
                .await
                .unwrap(),
            "stale\t2015\n"
        );
    }

    #[tokio::test]
    async fn test_read_missing_partition() {
        let handoff = InMemoryHandoff::new();
        handoff.write_partition(0, String::new()).await.unwrap();
        assert!(handoff.read_partition(&HandoffPartition::new(5)).await.is_err());
    }
}
