//! Retrieve -> generate -> execute -> analyze, with a stop before execute.
//!
//! Stages never mutate state directly. Each returns a [`StateUpdate`] that
//! the engine folds into the thread's [`WorkflowState`], then checkpoints.

pub mod checkpoint;
pub mod engine;
mod stages;
pub mod state;

pub use checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore, Stage};
pub use engine::{RunReport, RunStatus, WorkflowEngine};
pub use state::{StateUpdate, WorkflowState};
