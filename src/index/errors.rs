//! Error types for index lifecycle, refresh and query execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::datastore::StoreError;
use crate::db::DbError;
use crate::planner::PlannerError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Failures of the index subsystem
#[derive(Debug, Error)]
pub enum IndexError {
    /// A caller-supplied name, field or option is unusable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An index with the same name but a different definition exists
    #[error("index {name} already exists with a different definition")]
    IndexExists { name: String },

    /// A text index was requested but the engine lacks FTS support
    #[error("text search is not available in this storage engine")]
    TextSearchUnavailable,

    /// The storage engine rejected an index create, drop or update
    #[error("index operation failed: {context}")]
    IndexOpFailed {
        context: String,
        #[source]
        source: DbError,
    },

    /// The extension folder could not be prepared
    #[error("failed to prepare index database directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A queue submission failed outside create/drop/update
    #[error(transparent)]
    Db(#[from] DbError),

    /// The document-store collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The query could not be parsed or planned
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

impl IndexError {
    /// Wraps an engine error with the operation that hit it.
    pub(crate) fn op_failed(context: impl Into<String>) -> impl FnOnce(DbError) -> IndexError {
        let context = context.into();
        move |source| IndexError::IndexOpFailed { context, source }
    }
}
