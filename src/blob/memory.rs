//! In-memory blob backend.

use super::backend::BlobBackend;
use super::validation::normalize_key;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory blob backend using DashMap.
///
/// All data is lost when the process exits. Clones share the same data, so
/// tests can keep a handle to inspect what a component stored or deleted.
#[derive(Clone, Default)]
pub struct MemoryBlobBackend {
    data: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBlobBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blobs in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.data.insert(normalize_key(key)?, data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = normalize_key(key)?;
        Ok(self.data.get(&key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = normalize_key(key)?;
        Ok(self.data.remove(&key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = normalize_key(key)?;
        Ok(self.data.contains_key(&key))
    }
}
