use async_trait::async_trait;
use common::ExecutionId;
use serde_json::Value;

use crate::Result;

/// Storage for completed step outputs.
///
/// A checkpoint is keyed by execution ID and fully-qualified step name.
/// Once saved it is never overwritten by the runtime.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the checkpointed output of a step, if any.
    async fn load(&self, execution_id: ExecutionId, step: &str) -> Result<Option<Value>>;

    /// Saves the output of a completed step.
    async fn save(&self, execution_id: ExecutionId, step: &str, output: Value) -> Result<()>;
}
