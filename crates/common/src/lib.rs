//! Shared types for the order orchestration workspace.

mod types;

pub use types::ExecutionId;
