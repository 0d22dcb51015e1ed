//! Error types for sqlfns.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sqlfns operations.
#[derive(Debug, Error)]
pub enum SqlFnError {
    /// The statement directory could not be listed, or a file could not be read.
    #[error("Failed to load statements from {}: {source}", .path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A flattened composition was not an alternating statement/params list.
    #[error("Arity error: {0}")]
    Arity(String),

    /// The driver rejected or failed a statement.
    #[error("Execution error: {0}")]
    Execution(#[from] sqlx::Error),

    /// Rolling back after a failure also failed. The transaction's final
    /// state is unknown.
    #[error("Rollback failed: {source} (after: {original})")]
    Rollback {
        #[source]
        source: sqlx::Error,
        original: String,
    },

    /// Could not build the pool or check out a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No statement with that name was loaded.
    #[error("Unknown statement: '{0}'")]
    UnknownStatement(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlFnError {
    /// Create an arity error.
    pub fn arity(message: impl Into<String>) -> Self {
        Self::Arity(message.into())
    }

    /// Whether the database may have been left with uncommitted effects of
    /// unknown fate.
    pub fn is_rollback_failure(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }
}

/// Result type alias for sqlfns operations.
pub type SqlFnResult<T> = Result<T, SqlFnError>;
