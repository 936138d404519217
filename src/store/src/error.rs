//! Error types for storage backends

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by key-value storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// No storage backend exists in this execution context
    #[error("Storage backend unavailable")]
    Unavailable,

    /// The backend failed an engine or I/O operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored bytes could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True when the error means "no backend here", as opposed to a
    /// backend that exists but failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable)
    }
}
