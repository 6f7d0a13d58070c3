//! Redb-backed document backend.
//!
//! Provides persistent document storage using redb with ACID guarantees.
//! Each collection is a redb table of `id -> JSON bytes`. redb serializes
//! write transactions, so every read-modify-write below is atomic.

use super::backend::{CounterUpdate, DocumentBackend, apply_increment};
use super::query::{Filter, Query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

fn table_def(collection: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(collection)
}

fn decode(collection: &str, id: &str, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .with_context(|| format!("Failed to deserialize document '{collection}/{id}'"))
}

fn encode(doc: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).context("Failed to serialize document to JSON")
}

/// Redb-backed document backend.
///
/// Suitable for production use where durability is required.
///
/// # Thread Safety
///
/// `RedbDocumentBackend` is `Clone` and can be shared across threads. The
/// underlying database handles concurrent access safely.
#[derive(Clone)]
pub struct RedbDocumentBackend {
    db: Arc<Database>,
}

impl RedbDocumentBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, disk full, etc.)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open document database: {}", path.display()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn insert_sync(&self, collection: &str, id: &str, doc: &Value) -> Result<bool> {
        let bytes = encode(doc)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let inserted = {
            let mut table = write_txn
                .open_table(table_def(collection))
                .with_context(|| format!("Failed to open collection '{collection}'"))?;

            let exists = table
                .get(id)
                .with_context(|| format!("Failed to read '{collection}/{id}'"))?
                .is_some();

            if !exists {
                table
                    .insert(id, bytes.as_slice())
                    .with_context(|| format!("Failed to insert '{collection}/{id}'"))?;
            }
            !exists
        };

        write_txn
            .commit()
            .context("Failed to commit insert transaction")?;

        Ok(inserted)
    }

    fn get_sync(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let table = match read_txn.open_table(table_def(collection)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open collection '{collection}'"));
            },
        };

        let result = table
            .get(id)
            .with_context(|| format!("Failed to read '{collection}/{id}'"))?;

        match result {
            Some(guard) => decode(collection, id, guard.value()).map(Some),
            None => Ok(None),
        }
    }

    fn replace_if_sync(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: &Value,
    ) -> Result<Option<Value>> {
        let bytes = encode(doc)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let prior = {
            let mut table = write_txn
                .open_table(table_def(collection))
                .with_context(|| format!("Failed to open collection '{collection}'"))?;

            let current = table
                .get(id)
                .with_context(|| format!("Failed to read '{collection}/{id}'"))?
                .map(|g| decode(collection, id, g.value()))
                .transpose()?;

            match current {
                Some(current) if guard.matches(&current) => {
                    table
                        .insert(id, bytes.as_slice())
                        .with_context(|| format!("Failed to replace '{collection}/{id}'"))?;
                    Some(current)
                },
                _ => None,
            }
        };

        write_txn
            .commit()
            .context("Failed to commit replace transaction")?;

        Ok(prior)
    }

    fn take_sync(
        &self,
        collection: &str,
        id: &str,
        guard: Option<&Filter>,
    ) -> Result<Option<Value>> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let prior = {
            let mut table = write_txn
                .open_table(table_def(collection))
                .with_context(|| format!("Failed to open collection '{collection}'"))?;

            let current = table
                .get(id)
                .with_context(|| format!("Failed to read '{collection}/{id}'"))?
                .map(|g| decode(collection, id, g.value()))
                .transpose()?;

            match current {
                Some(current) if guard.is_none_or(|g| g.matches(&current)) => {
                    table
                        .remove(id)
                        .with_context(|| format!("Failed to remove '{collection}/{id}'"))?;
                    Some(current)
                },
                _ => None,
            }
        };

        write_txn
            .commit()
            .context("Failed to commit delete transaction")?;

        Ok(prior)
    }

    fn increment_many_sync(
        &self,
        collection: &str,
        ids: &[String],
        field: &str,
        delta: i64,
    ) -> Result<Vec<(String, CounterUpdate)>> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let mut updates = Vec::with_capacity(ids.len());
        {
            let mut table = write_txn
                .open_table(table_def(collection))
                .with_context(|| format!("Failed to open collection '{collection}'"))?;

            for id in ids {
                let current = table
                    .get(id.as_str())
                    .with_context(|| format!("Failed to read '{collection}/{id}'"))?
                    .map(|g| decode(collection, id, g.value()))
                    .transpose()?;

                let Some(mut doc) = current else {
                    continue;
                };
                let update = apply_increment(&mut doc, field, delta)
                    .with_context(|| format!("Failed to update '{collection}/{id}.{field}'"))?;
                let bytes = encode(&doc)?;
                table
                    .insert(id.as_str(), bytes.as_slice())
                    .with_context(|| format!("Failed to write '{collection}/{id}'"))?;
                updates.push((id.clone(), update));
            }
        }

        write_txn
            .commit()
            .context("Failed to commit increment transaction")?;

        Ok(updates)
    }

    fn find_sync(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let table = match read_txn.open_table(table_def(collection)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open collection '{collection}'"));
            },
        };

        let mut matched = Vec::new();
        for item in table
            .iter()
            .with_context(|| format!("Failed to iterate collection '{collection}'"))?
        {
            let (key, value) = item.context("Failed to read document entry")?;
            let id = key.value();
            match decode(collection, id, value.value()) {
                Ok(doc) if query.filter.matches(&doc) => matched.push((id.to_string(), doc)),
                Ok(_) => {},
                Err(e) => {
                    // Skip corrupt entries so one bad document does not block reads
                    tracing::warn!(collection, id, error = %e, "Skipping undecodable document");
                },
            }
        }

        Ok(query.finish(matched))
    }
}

#[async_trait]
impl DocumentBackend for RedbDocumentBackend {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<bool> {
        let backend = self.clone();
        let (collection, id) = (collection.to_string(), id.to_string());
        tokio::task::spawn_blocking(move || backend.insert_sync(&collection, &id, &doc))
            .await
            .context("Task join error")?
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let backend = self.clone();
        let (collection, id) = (collection.to_string(), id.to_string());
        tokio::task::spawn_blocking(move || backend.get_sync(&collection, &id))
            .await
            .context("Task join error")?
    }

    async fn replace_if(
        &self,
        collection: &str,
        id: &str,
        guard: &Filter,
        doc: Value,
    ) -> Result<Option<Value>> {
        let backend = self.clone();
        let (collection, id, guard) = (collection.to_string(), id.to_string(), guard.clone());
        tokio::task::spawn_blocking(move || backend.replace_if_sync(&collection, &id, &guard, &doc))
            .await
            .context("Task join error")?
    }

    async fn take(
        &self,
        collection: &str,
        id: &str,
        guard: Option<&Filter>,
    ) -> Result<Option<Value>> {
        let backend = self.clone();
        let (collection, id, guard) = (collection.to_string(), id.to_string(), guard.cloned());
        tokio::task::spawn_blocking(move || backend.take_sync(&collection, &id, guard.as_ref()))
            .await
            .context("Task join error")?
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<CounterUpdate>> {
        let updates = self
            .increment_many(collection, &[id.to_string()], field, delta)
            .await?;
        Ok(updates.into_iter().next().map(|(_, update)| update))
    }

    async fn increment_many(
        &self,
        collection: &str,
        ids: &[String],
        field: &str,
        delta: i64,
    ) -> Result<Vec<(String, CounterUpdate)>> {
        let backend = self.clone();
        let (collection, ids, field) = (collection.to_string(), ids.to_vec(), field.to_string());
        tokio::task::spawn_blocking(move || {
            backend.increment_many_sync(&collection, &ids, &field, delta)
        })
        .await
        .context("Task join error")?
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let backend = self.clone();
        let (collection, query) = (collection.to_string(), query.clone());
        tokio::task::spawn_blocking(move || backend.find_sync(&collection, &query))
            .await
            .context("Task join error")?
    }
}
