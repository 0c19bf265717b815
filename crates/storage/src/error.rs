use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("unsupported index type {0:?}")]
    UnsupportedIndex(String),
    #[error("corrupt index: {0}")]
    CorruptIndex(String),
    #[error("fragment {id} out of range (store holds {count})")]
    LookupFailure { id: usize, count: usize },
}
