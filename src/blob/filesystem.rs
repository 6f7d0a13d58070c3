//! Filesystem-backed blob backend.
//!
//! Blobs are plain files under a base directory, keyed by their normalized
//! relative path. Writes go to a temporary sibling first and are renamed
//! into place, so readers never observe a partially written blob.

use super::backend::BlobBackend;
use super::validation::blob_path;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-backed blob backend.
///
/// # Thread Safety
///
/// `FilesystemBlobBackend` is `Clone` and can be shared across threads.
#[derive(Clone)]
pub struct FilesystemBlobBackend {
    base_dir: PathBuf,
}

impl FilesystemBlobBackend {
    /// Creates or opens the backend rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).with_context(|| {
            format!("Failed to create blob directory: {}", base_dir.display())
        })?;
        Ok(Self { base_dir })
    }

    /// Root directory of the backend.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn put_sync(&self, key: &str, data: &[u8]) -> Result<()> {
        let file_path = blob_path(&self.base_dir, key)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directories for: {key}"))?;
        }

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path =
            file_path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        fs::write(&tmp_path, data).with_context(|| format!("Failed to write blob: {key}"))?;
        if let Err(e) = fs::rename(&tmp_path, &file_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("Failed to move blob into place: {key}"));
        }

        Ok(())
    }

    fn get_sync(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let file_path = blob_path(&self.base_dir, key)?;
        match fs::read(&file_path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read blob: {key}")),
        }
    }

    fn delete_sync(&self, key: &str) -> Result<bool> {
        let file_path = blob_path(&self.base_dir, key)?;
        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            // Already gone: a concurrent reclaim got there first
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob: {key}")),
        }
    }

    fn exists_sync(&self, key: &str) -> Result<bool> {
        let file_path = blob_path(&self.base_dir, key)?;
        Ok(file_path.is_file())
    }
}

#[async_trait]
impl BlobBackend for FilesystemBlobBackend {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let backend = self.clone();
        let (key, data) = (key.to_string(), data.to_vec());
        tokio::task::spawn_blocking(move || backend.put_sync(&key, &data))
            .await
            .context("Task join error")?
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.get_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.delete_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.exists_sync(&key))
            .await
            .context("Task join error")?
    }
}
