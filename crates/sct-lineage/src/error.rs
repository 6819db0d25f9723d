//! Error types for lineage traversal.

use sct_types::EntityRef;

/// Failures reported by a [`GraphSource`](crate::GraphSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The backing store did not answer in time.
    #[error("data source timed out: {0}")]
    Timeout(String),

    /// The backing store is unavailable or returned an error.
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during a lineage query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// The start entity does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityRef),

    /// The traversal reached the hard node ceiling.
    #[error("lineage exceeds {limit} nodes")]
    LineageTooLarge {
        /// The configured node ceiling.
        limit: usize,
    },

    /// A graph data source call timed out. Callers may retry.
    #[error("data source timeout: {0}")]
    DataSourceTimeout(String),

    /// A graph data source call failed for another reason.
    #[error("data source error: {0}")]
    DataSource(String),
}

impl LineageError {
    /// Returns `true` if the caller may retry the query unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataSourceTimeout(_))
    }
}

impl From<SourceError> for LineageError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Timeout(msg) => Self::DataSourceTimeout(msg),
            SourceError::Unavailable(msg) => Self::DataSource(msg),
        }
    }
}

/// Convenience alias for lineage operations.
pub type TraceResult<T> = Result<T, LineageError>;
