pub mod agent;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod executor;
pub mod index;
pub mod model;
pub mod providers;
pub mod schema;
pub mod storage;
pub mod workflow;
