//! High-level `DocumentStore` wrapper over backend implementations.
//!
//! Provides typed (serde) access on top of any `DocumentBackend`.

use super::backend::{CounterUpdate, DocumentBackend};
use super::memory::MemoryDocumentBackend;
use super::query::{Filter, Query};
use super::redb::RedbDocumentBackend;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// High-level document store interface.
///
/// Wraps a `DocumentBackend` implementation and converts between domain
/// types and JSON documents.
///
/// # Thread Safety
///
/// `DocumentStore` is `Clone` and can be shared across threads. The
/// underlying backend handles concurrent access safely.
///
/// # Example
///
/// ```ignore
/// use plaza::store::{DocumentStore, Filter};
///
/// let store = DocumentStore::memory();
/// store.insert("profiles", "alice", &Profile::new("alice")).await?;
/// let profile: Option<Profile> = store.get("profiles", "alice").await?;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
}

impl DocumentStore {
    /// Creates a new `DocumentStore` backed by a file-based redb database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = RedbDocumentBackend::open(path)?;
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Creates a new `DocumentStore` backed by an in-memory store.
    ///
    /// All data is lost when the process exits.
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryDocumentBackend::new()),
        }
    }

    /// Creates a new `DocumentStore` with a custom backend.
    pub fn custom<B: DocumentBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Creates a new `DocumentStore` from a boxed backend.
    pub fn from_boxed(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend: Arc::from(backend),
        }
    }

    /// Inserts `doc` under `id` unless the id is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage operation fails.
    pub async fn insert<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<bool> {
        self.backend.insert(collection, id, to_doc(doc)?).await
    }

    /// Retrieves and deserializes a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation or deserialization fails.
    pub async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.backend
            .get(collection, id)
            .await?
            .map(|doc| from_doc(collection, id, doc))
            .transpose()
    }

    /// Retrieves a document without deserializing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_raw(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.backend.get(collection, id).await
    }

    /// Checks whether a document exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self.backend.get(collection, id).await?.is_some())
    }

    /// Compare-and-swap: replaces the document if it matches `guard`,
    /// returning the prior version.
    ///
    /// # Errors
    ///
    /// Returns an error if (de)serialization or the storage operation fails.
    pub async fn replace_if<T: Serialize + DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: &T,
    ) -> Result<Option<T>> {
        self.backend
            .replace_if(collection, id, guard, to_doc(doc)?)
            .await?
            .map(|prior| from_doc(collection, id, prior))
            .transpose()
    }

    /// Conditional delete returning the removed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation or deserialization fails.
    pub async fn take<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        guard: Option<&Filter>,
    ) -> Result<Option<T>> {
        self.backend
            .take(collection, id, guard)
            .await?
            .map(|prior| from_doc(collection, id, prior))
            .transpose()
    }

    /// Atomic, zero-floored increment of an integer field.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<CounterUpdate>> {
        self.backend.increment(collection, id, field, delta).await
    }

    /// Batched increment across several documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn increment_many(
        &self,
        collection: &str,
        ids: &[String],
        field: &str,
        delta: i64,
    ) -> Result<Vec<(String, CounterUpdate)>> {
        self.backend
            .increment_many(collection, ids, field, delta)
            .await
    }

    /// Finds and deserializes documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation or deserialization fails.
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<T>> {
        self.backend
            .find(collection, query)
            .await?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc)
                    .with_context(|| format!("Failed to deserialize document in '{collection}'"))
            })
            .collect()
    }

    /// Counts documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.backend.count(collection, filter).await
    }
}

fn to_doc<T: Serialize>(doc: &T) -> Result<Value> {
    serde_json::to_value(doc).context("Failed to serialize document")
}

fn from_doc<T: DeserializeOwned>(collection: &str, id: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc)
        .with_context(|| format!("Failed to deserialize document '{collection}/{id}'"))
}
