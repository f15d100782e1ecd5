use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems surfaced to the CLI as exit code 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Failures callers are expected to match on.
///
/// Everything else travels as `anyhow::Error` with context attached, and
/// query/generation failures inside the pipeline are carried as state data
/// rather than errors.
#[derive(Debug, Error)]
pub enum SqlsageError {
    #[error("database not found: {}", .0.display())]
    DatabaseUnavailable(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("nothing to resume for thread '{0}'")]
    NothingPending(String),
}

/// Returns the typed error behind an `anyhow::Error`, if there is one.
pub fn try_map_error(e: &anyhow::Error) -> Option<&SqlsageError> {
    e.downcast_ref::<SqlsageError>()
}
