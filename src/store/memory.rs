//! In-memory document backend.
//!
//! Provides a fast, non-persistent document store using DashMap for
//! concurrent access. Ideal for testing, development, and embedded use cases.

use super::backend::{CounterUpdate, DocumentBackend, apply_increment};
use super::query::{Filter, Query};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;

type Collection = Arc<DashMap<String, Value>>;

/// In-memory document backend using DashMap.
///
/// Each collection is its own `DashMap`; single-document operations hold the
/// shard lock for the key while they read and write, which makes the
/// conditional operations atomic. All data is lost when the process exits.
///
/// # Thread Safety
///
/// `MemoryDocumentBackend` is `Clone`; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDocumentBackend {
    collections: Arc<DashMap<String, Collection>>,
}

impl MemoryDocumentBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |c| c.value().len())
    }

    /// Clears all collections.
    pub fn clear(&self) {
        self.collections.clear();
    }

    fn collection(&self, name: &str) -> Collection {
        if let Some(existing) = self.collections.get(name) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.collections.entry(name.to_string()).or_default().value())
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<bool> {
        match self.collection(collection).entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(true)
            },
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collection(collection)
            .get(id)
            .map(|entry| entry.value().clone()))
    }

    async fn replace_if(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Value,
    ) -> Result<Option<Value>> {
        let docs = self.collection(collection);
        let Some(mut entry) = docs.get_mut(id) else {
            return Ok(None);
        };
        if !guard.matches(entry.value()) {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(entry.value_mut(), doc)))
    }

    async fn take(
        &self,
        collection: &str,
        id: &str,
        guard: Option<&Filter>,
    ) -> Result<Option<Value>> {
        let docs = self.collection(collection);
        let removed = match guard {
            Some(guard) => docs.remove_if(id, |_, doc| guard.matches(doc)),
            None => docs.remove(id),
        };
        Ok(removed.map(|(_, doc)| doc))
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<CounterUpdate>> {
        let docs = self.collection(collection);
        let Some(mut entry) = docs.get_mut(id) else {
            return Ok(None);
        };
        apply_increment(entry.value_mut(), field, delta).map(Some)
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let matched: Vec<(String, Value)> = self
            .collection(collection)
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        Ok(query.finish(matched))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self
            .collection(collection)
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let backend = MemoryDocumentBackend::new();

        backend.insert("posts", "x", json!({"n": 1})).await.unwrap();
        backend.insert("reels", "x", json!({"n": 2})).await.unwrap();

        assert_eq!(backend.len("posts"), 1);
        assert_eq!(backend.len("reels"), 1);
        assert_eq!(backend.get("reels", "x").await.unwrap().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let backend = MemoryDocumentBackend::new();
        let clone = backend.clone();

        backend.insert("posts", "p1", json!({})).await.unwrap();
        assert!(clone.get("posts", "p1").await.unwrap().is_some());

        clone.clear();
        assert_eq!(backend.len("posts"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_takes_have_one_winner() {
        let backend = MemoryDocumentBackend::new();
        backend.insert("stories", "s1", json!({"id": "s1"})).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let backend = backend.clone();
                tokio::spawn(async move { backend.take("stories", "s1", None).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
