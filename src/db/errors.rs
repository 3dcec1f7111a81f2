//! Error types for the single-writer queue.

use thiserror::Error;

/// Result type for index database operations
pub type DbResult<T> = Result<T, DbError>;

/// Failures surfaced by the writer queue and the embedded engine
#[derive(Debug, Error)]
pub enum DbError {
    /// The storage engine rejected a statement
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The queue shut down before the submission completed
    #[error("submission interrupted: the writer queue has shut down")]
    Interrupted,

    /// A submission terminated abnormally
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
