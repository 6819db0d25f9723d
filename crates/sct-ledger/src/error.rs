/// Errors produced by custody ledger operations.
///
/// Every mutating operation is all-or-nothing: when one of these is returned
/// the store is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid {field}: {value} (must be a positive, finite quantity)")]
    InvalidQuantity { field: &'static str, value: f64 },

    #[error("custody chain '{0}' already exists")]
    DuplicateChainId(String),

    #[error("custody chain '{0}' not found")]
    ChainNotFound(String),

    #[error("chain '{chain_id}' has {available} remaining, cannot remove {requested}")]
    InsufficientQuantity {
        chain_id: String,
        requested: f64,
        available: f64,
    },

    #[error("splits of chain '{chain_id}' total {requested}, only {available} remaining")]
    SplitExceedsAvailable {
        chain_id: String,
        requested: f64,
        available: f64,
    },

    #[error("chain '{chain_id}' holds '{found}', expected '{expected}'")]
    ProductTypeMismatch {
        chain_id: String,
        expected: String,
        found: String,
    },

    #[error("chain '{0}' has nothing left to merge")]
    EmptyChainMerge(String),

    #[error("output exceeds input beyond tolerance: waste would be {waste}")]
    NegativeWaste { waste: f64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("event type '{0}' is recorded by split/merge, not directly")]
    UnsupportedEventType(String),

    #[error("idempotency key '{0}' was already used for a different request")]
    IdempotencyConflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
