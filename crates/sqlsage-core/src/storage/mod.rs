pub mod checkpoints;
pub mod schema;

pub use checkpoints::SqliteCheckpointStore;
