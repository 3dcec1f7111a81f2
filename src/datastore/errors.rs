//! Error types for the revision forest and the document-store interface.

use thiserror::Error;

/// Result type for revision forest operations
pub type ForestResult<T> = Result<T, ForestError>;

/// Precondition failures of the revision forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForestError {
    /// The sequence number has already been added
    #[error("revision with sequence {0} is already in the forest")]
    AlreadyPresent(i64),

    /// A non-root revision referenced a parent sequence that is absent
    #[error("parent sequence {parent} of revision with sequence {sequence} is not in the forest")]
    OrphanRevision { sequence: i64, parent: i64 },

    /// The requested sequence number is not in the forest
    #[error("no revision with sequence {0} in the forest")]
    NotInTree(i64),

    /// No leaf revision carries the current flag
    #[error("no leaf revision is marked current")]
    NoCurrent,
}

/// Result type for document-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by the document-store collaborator
#[derive(Debug, Error)]
#[error("document store error: {message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create an error from a message alone
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forest_error_display() {
        let err = ForestError::OrphanRevision {
            sequence: 7,
            parent: 3,
        };
        let display = format!("{}", err);
        assert!(display.contains("parent sequence 3"));
        assert!(display.contains("sequence 7"));
    }

    #[test]
    fn test_store_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StoreError::with_source("body lookup failed", io);
        assert_eq!(err.message(), "body lookup failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
