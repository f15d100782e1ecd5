pub mod analyzer;
pub mod generator;
pub mod prompts;

pub use analyzer::ResultAnalyzer;
pub use generator::{clean_sql, SqlGenerator};
