//! Durable execution primitives.
//!
//! An [`ExecutionContext`] exposes three operations a workflow is written
//! against:
//! - `step(name, f)` runs `f` once per execution and checkpoints its output
//! - `parallel(name, branches)` fans out branches in isolated child contexts
//!   and joins all of them
//! - `wait(name, duration)` pauses, resumably and cancellably
//!
//! Persistence is delegated to a [`CheckpointStore`]. Without a store the
//! context degrades to plain calls.

pub mod context;
pub mod error;
pub mod memory;
pub mod store;

pub use context::{Branch, ExecutionContext, StepRetryPolicy, branch};
pub use error::{ExecutionError, Result};
pub use memory::InMemoryCheckpointStore;
pub use store::CheckpointStore;
