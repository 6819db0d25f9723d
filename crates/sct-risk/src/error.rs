/// Errors raised while evaluating a single risk predicate.
///
/// These never abort a lineage query: the evaluator logs them and records
/// the entity as unevaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskError {
    /// An external monitoring lookup did not answer in time.
    #[error("predicate '{predicate}' timed out")]
    Timeout { predicate: String },

    /// An external monitoring lookup failed.
    #[error("predicate '{predicate}' lookup failed: {message}")]
    Lookup { predicate: String, message: String },

    /// A well-known data key held a value of the wrong shape.
    #[error("predicate '{predicate}' cannot read key '{key}': {reason}")]
    InvalidData {
        predicate: String,
        key: String,
        reason: String,
    },
}

impl RiskError {
    /// Create an invalid-data error for a predicate and key.
    pub fn invalid_data(
        predicate: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidData {
            predicate: predicate.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
