//! Key-value store contract shared by every backend

use crate::error::Result;
use async_trait::async_trait;

/// A string-keyed mapping with prefix enumeration.
///
/// Implementations must be safe to share across tasks. Values are opaque to
/// the store; callers own serialization.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, in ascending lexicographic
    /// order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every entry in the store.
    async fn clear(&self) -> Result<()>;
}
