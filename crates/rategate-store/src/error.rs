//! Error types for configuration stores.

/// Errors from reading or writing rate-limit configuration.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("config store i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored document could not be encoded or decoded.
    #[error("config store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The store is temporarily unable to serve requests.
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
