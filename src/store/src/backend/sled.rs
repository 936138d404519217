//! Durable key-value backend on sled

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use tracing::debug;

/// Tree holding every Deadbolt entry, kept separate from anything else the
/// host application stores in the same database.
const DEADBOLT_TREE: &str = "deadbolt_kv";

/// Durable store backed by a sled tree.
///
/// sled iterates keys in lexicographic byte order, which is what
/// [`KeyValueStore::keys_with_prefix`] promises; no re-sorting is needed.
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a database at `path` and bind the Deadbolt tree.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| StoreError::Backend(format!("Failed to open database: {}", e)))?;
        debug!("Opened sled database at {:?}", path.as_ref());
        Self::new(&db)
    }

    /// Bind the Deadbolt tree inside an existing database handle, for hosts
    /// that already keep a sled database open.
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db
            .open_tree(DEADBOLT_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Force outstanding writes to disk.
    ///
    /// sled flushes on its own cadence; call this before handing control to
    /// anything that may kill the process.
    pub fn flush(&self) -> Result<()> {
        self.tree
            .flush()
            .map(|_| ())
            .map_err(|e| StoreError::Backend(format!("Flush error: {}", e)))
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True when the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn decode_value(value: sled::IVec) -> Result<String> {
        String::from_utf8(value.to_vec())
            .map_err(|e| StoreError::Serialization(format!("Invalid UTF-8 in stored value: {}", e)))
    }

    fn decode_key(key: sled::IVec) -> Result<String> {
        String::from_utf8(key.to_vec())
            .map_err(|e| StoreError::Serialization(format!("Invalid UTF-8 in stored key: {}", e)))
    }
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .tree
            .get(key.as_bytes())
            .map_err(|e| StoreError::Backend(format!("Read error: {}", e)))?
        {
            Some(value) => Ok(Some(Self::decode_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map(|_| ())
            .map_err(|e| StoreError::Backend(format!("Write error: {}", e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.tree
            .remove(key.as_bytes())
            .map(|_| ())
            .map_err(|e| StoreError::Backend(format!("Delete error: {}", e)))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) =
                item.map_err(|e| StoreError::Backend(format!("Scan error: {}", e)))?;
            keys.push(Self::decode_key(key)?);
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        self.tree
            .clear()
            .map_err(|e| StoreError::Backend(format!("Clear error: {}", e)))
    }
}
