use providers::ProviderError;
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error("query vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("threshold must be a number, got {0}")]
    InvalidThreshold(f64),
    /// The index returned a row the fragment store does not hold.
    #[error("index and metadata out of sync: {0}")]
    Consistency(StorageError),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("index holds {vectors} vectors but metadata holds {fragments} fragments")]
    CountMismatch { vectors: usize, fragments: usize },
    #[error("embedder produces {embedder}-dim vectors, index is {index}-dim")]
    DimensionMismatch { embedder: usize, index: usize },
}
