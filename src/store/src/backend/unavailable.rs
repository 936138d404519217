//! Null backend for contexts with no persistence

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;
use async_trait::async_trait;

/// A backend that reports every operation as [`StoreError::Unavailable`].
///
/// Wired in when the process has no storage at all, so callers exercise
/// their degraded paths instead of panicking on a missing backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    /// Create the null backend.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(StoreError::Unavailable)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(StoreError::Unavailable)
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(StoreError::Unavailable)
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
        Err(StoreError::Unavailable)
    }

    async fn clear(&self) -> Result<()> {
        Err(StoreError::Unavailable)
    }
}
