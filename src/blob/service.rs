//! High-level `BlobStore` wrapper over backend implementations.

use super::backend::BlobBackend;
use super::filesystem::FilesystemBlobBackend;
use super::memory::MemoryBlobBackend;
use super::types::BlobRef;
use anyhow::{Result, bail};
use std::path::Path;
use std::sync::Arc;

/// Extension used when the content type is unknown or absent.
const DEFAULT_EXTENSION: &str = "bin";

/// High-level blob store interface.
///
/// Generates blob references on `put` and makes `delete` idempotent, which
/// is the contract the engagement components rely on.
///
/// # Example
///
/// ```ignore
/// use plaza::blob::BlobStore;
///
/// let blobs = BlobStore::memory();
/// let media = blobs.put("stories", &bytes, Some("image/jpeg")).await?;
/// assert!(blobs.exists(&media).await?);
/// blobs.delete(&media).await?;
/// blobs.delete(&media).await?; // still Ok
/// ```
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
}

impl BlobStore {
    /// Creates a new `BlobStore` backed by a filesystem directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = FilesystemBlobBackend::open(path)?;
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Creates a new `BlobStore` backed by an in-memory store.
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryBlobBackend::new()),
        }
    }

    /// Creates a new `BlobStore` with a custom backend.
    pub fn custom<B: BlobBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Creates a new `BlobStore` from a boxed backend.
    pub fn from_boxed(backend: Box<dyn BlobBackend>) -> Self {
        Self {
            backend: Arc::from(backend),
        }
    }

    /// Stores `data` under a freshly generated key in `namespace`.
    ///
    /// The key is `<namespace>/<uuid>.<ext>`, with the extension derived
    /// from `content_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is empty or the backend write fails.
    pub async fn put(
        &self,
        namespace: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<BlobRef> {
        if data.is_empty() {
            bail!("Refusing to store an empty blob in '{namespace}'");
        }

        let extension = content_type
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|extensions| extensions.first().copied())
            .unwrap_or(DEFAULT_EXTENSION);
        let key = format!("{namespace}/{}.{extension}", uuid::Uuid::new_v4());

        self.backend.put(&key, data).await?;
        tracing::debug!(key = %key, size = data.len(), "Stored blob");
        Ok(BlobRef::from(key))
    }

    /// Retrieves a blob's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is invalid or the read fails.
    pub async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>> {
        self.backend.get(blob.as_str()).await
    }

    /// Deletes a blob. Deleting a missing blob is not an error.
    ///
    /// Returns whether this call removed anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is invalid or the backend fails.
    pub async fn delete(&self, blob: &BlobRef) -> Result<bool> {
        let removed = self.backend.delete(blob.as_str()).await?;
        if !removed {
            tracing::debug!(key = %blob, "Blob already absent");
        }
        Ok(removed)
    }

    /// Checks whether a blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is invalid or the check fails.
    pub async fn exists(&self, blob: &BlobRef) -> Result<bool> {
        self.backend.exists(blob.as_str()).await
    }
}
