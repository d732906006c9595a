use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ExecutionId;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{CheckpointStore, Result};

/// In-memory checkpoint store.
///
/// Checkpoints live as long as the store; cloning shares the same storage.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<(ExecutionId, String), Value>>>,
}

impl InMemoryCheckpointStore {
    /// Creates a new empty in-memory checkpoint store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of checkpoints stored.
    pub async fn checkpoint_count(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    /// Returns true if the given step has a checkpoint.
    pub async fn has_checkpoint(&self, execution_id: ExecutionId, step: &str) -> bool {
        self.checkpoints
            .read()
            .await
            .contains_key(&(execution_id, step.to_string()))
    }

    /// Returns the checkpointed step names of one execution, sorted.
    pub async fn steps(&self, execution_id: ExecutionId) -> Vec<String> {
        let mut steps: Vec<String> = self
            .checkpoints
            .read()
            .await
            .keys()
            .filter(|(id, _)| *id == execution_id)
            .map(|(_, step)| step.clone())
            .collect();
        steps.sort();
        steps
    }

    /// Clears all checkpoints.
    pub async fn clear(&self) {
        self.checkpoints.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, execution_id: ExecutionId, step: &str) -> Result<Option<Value>> {
        Ok(self
            .checkpoints
            .read()
            .await
            .get(&(execution_id, step.to_string()))
            .cloned())
    }

    async fn save(&self, execution_id: ExecutionId, step: &str, output: Value) -> Result<()> {
        self.checkpoints
            .write()
            .await
            .entry((execution_id, step.to_string()))
            .or_insert(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryCheckpointStore::new();
        let id = ExecutionId::new();

        assert!(store.load(id, "a").await.unwrap().is_none());
        store.save(id, "a", json!(42)).await.unwrap();

        assert_eq!(store.load(id, "a").await.unwrap(), Some(json!(42)));
        assert!(store.has_checkpoint(id, "a").await);
        assert_eq!(store.checkpoint_count().await, 1);
    }

    #[tokio::test]
    async fn test_first_checkpoint_wins() {
        let store = InMemoryCheckpointStore::new();
        let id = ExecutionId::new();

        store.save(id, "a", json!("first")).await.unwrap();
        store.save(id, "a", json!("second")).await.unwrap();

        assert_eq!(store.load(id, "a").await.unwrap(), Some(json!("first")));
    }

    #[tokio::test]
    async fn test_executions_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        let a = ExecutionId::new();
        let b = ExecutionId::new();

        store.save(a, "step", json!(1)).await.unwrap();
        store.save(a, "other", json!(2)).await.unwrap();

        assert!(store.load(b, "step").await.unwrap().is_none());
        assert_eq!(store.steps(a).await, vec!["other", "step"]);
        assert!(store.steps(b).await.is_empty());

        store.clear().await;
        assert_eq!(store.checkpoint_count().await, 0);
    }
}
