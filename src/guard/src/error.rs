//! Error types for the guard subsystem

use deadbolt_store::StoreError;
use thiserror::Error;

/// Result type for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard subsystem errors
#[derive(Debug, Error)]
pub enum GuardError {
    /// A configuration value was rejected before being persisted
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The settings store failed an operation it was expected to survive
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),
}
