use thiserror::Error;

/// Errors raised by the execution runtime itself (never by step bodies).
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The checkpoint store failed to load or save.
    #[error("Checkpoint store error: {0}")]
    Checkpoint(String),

    /// A step output could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The execution was cancelled while suspended.
    #[error("Execution cancelled during '{step}'")]
    Cancelled { step: String },
}

/// Result type for execution runtime operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;
