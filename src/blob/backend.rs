//! Backend trait for the blob store.
//!
//! Defines the key-addressable interface all blob backends implement
//! (filesystem, memory, or an object store such as S3).

use anyhow::Result;
use async_trait::async_trait;

/// Backend trait for blob storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
#[async_trait]
pub trait BlobBackend: Send + Sync + 'static {
    /// Stores `data` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Retrieves a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the read fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes a blob.
    ///
    /// # Returns
    /// * `Ok(true)` - Blob existed and was deleted
    /// * `Ok(false)` - Blob did not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or deletion fails.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Checks whether a blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the check fails.
    async fn exists(&self, key: &str) -> Result<bool>;
}
