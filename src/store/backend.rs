//! Backend trait for the document store.
//!
//! Defines the interface that all document-store backends must implement,
//! enabling pluggable storage (redb, memory, a networked document database).

use super::query::{Filter, Query};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Outcome of an atomic counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    /// Counter value after the update.
    pub value: i64,
    /// Value the update would have produced without the zero floor.
    pub unclamped: i64,
}

impl CounterUpdate {
    /// Applies `delta` to `current`, clamping the result at zero.
    pub fn apply(current: i64, delta: i64) -> Self {
        let unclamped = current.saturating_add(delta);
        Self {
            value: unclamped.max(0),
            unclamped,
        }
    }

    /// Whether the zero floor was hit.
    pub fn clamped(&self) -> bool {
        self.unclamped < 0
    }
}

/// Backend trait for document storage.
///
/// Documents are JSON objects grouped in named collections and addressed by
/// string id. Every method must be atomic with respect to the single
/// document it touches; the conditional methods (`insert`, `replace_if`,
/// `take`) are what callers rely on instead of check-then-act sequences.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    /// Inserts a document if no document with `id` exists.
    ///
    /// Returns `Ok(false)` without writing when the id is taken. This is the
    /// uniqueness constraint: compound keys are encoded into the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<bool>;

    /// Retrieves a document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Replaces the document only if it currently matches `guard`.
    ///
    /// Returns the prior document when the swap happened, `Ok(None)` when the
    /// document is missing or did not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn replace_if(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Value,
    ) -> Result<Option<Value>>;

    /// Deletes the document if it is still present (and matches `guard`, when
    /// given), returning the prior value.
    ///
    /// `Ok(None)` means this call removed nothing, so exactly one of several
    /// concurrent callers observes `Some`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn take(&self, collection: &str, id: &str, guard: Option<&Filter>)
    -> Result<Option<Value>>;

    /// Atomically adds `delta` to an integer field, clamping at zero.
    ///
    /// A missing field counts as zero. Returns `Ok(None)` if the document
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the field holds a non-integer value or the
    /// underlying storage operation fails.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<CounterUpdate>>;

    /// Applies the same increment to several documents in one batch.
    ///
    /// Missing documents are skipped. Backends with transactions should
    /// override this to use a single write; the default loops.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn increment_many(
        &self,
        collection: &str,
        ids: &[String],
        field: &str,
        delta: i64,
    ) -> Result<Vec<(String, CounterUpdate)>> {
        let mut updates = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(update) = self.increment(collection, id, field, delta).await? {
                updates.push((id.clone(), update));
            }
        }
        Ok(updates)
    }

    /// Finds documents matching the query's filter, sorted and paginated.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>>;

    /// Counts documents matching `filter`.
    ///
    /// Default implementation uses `find()`, but backends may override
    /// for efficiency.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let docs = self.find(collection, &Query::new(filter.clone())).await?;
        Ok(docs.len() as u64)
    }
}

/// Reads an integer counter field, treating a missing field as zero.
pub(crate) fn read_counter(doc: &Value, field: &str) -> Result<i64> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("Field '{field}' is not an integer counter: {value}")),
    }
}

/// Applies an increment to a JSON document in place.
pub(crate) fn apply_increment(doc: &mut Value, field: &str, delta: i64) -> Result<CounterUpdate> {
    let current = read_counter(doc, field)?;
    let update = CounterUpdate::apply(current, delta);
    let object = doc
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Document is not a JSON object"))?;
    object.insert(field.to_string(), Value::from(update.value));
    Ok(update)
}
