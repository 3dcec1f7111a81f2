//! Error types for query parsing and planning.

use thiserror::Error;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Failures producing a query plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    /// No index covers the fields a query clause references
    #[error("no index covers the queried fields: {}", .fields.join(", "))]
    NoUsableIndex { fields: Vec<String> },

    /// The query AST is malformed
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
