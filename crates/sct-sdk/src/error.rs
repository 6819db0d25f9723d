use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("lineage error: {0}")]
    Lineage(#[from] sct_lineage::LineageError),

    #[error("graph source error: {0}")]
    Source(#[from] sct_lineage::SourceError),

    #[error("ledger error: {0}")]
    Ledger(#[from] sct_ledger::LedgerError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid dataset: {0}")]
    Dataset(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Returns `true` if repeating the call unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lineage(e) if e.is_retryable())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
