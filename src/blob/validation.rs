//! Key validation for the blob store.
//!
//! Blob keys become filesystem paths in the filesystem backend, so every
//! backend runs them through the same normalization.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

/// Validates and normalizes a blob key to prevent directory traversal.
///
/// Rejects keys that are empty, absolute, or contain `..`, root or prefix
/// components. `.` components are dropped.
pub(crate) fn validate_key(key: &str) -> Result<PathBuf> {
    if key.is_empty() {
        bail!("Blob key cannot be empty");
    }

    let path = Path::new(key);
    if path.is_absolute() {
        bail!("Blob key cannot be absolute: {key}");
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::CurDir => {},
            Component::ParentDir => bail!("Blob key cannot contain '..': {key}"),
            Component::RootDir | Component::Prefix(_) => {
                bail!("Blob key cannot contain root or prefix: {key}")
            },
        }
    }

    if normalized.as_os_str().is_empty() {
        bail!("Blob key normalized to empty path: {key}");
    }

    Ok(normalized)
}

/// Normalized key as a forward-slash string, used as the map key in memory.
pub(crate) fn normalize_key(key: &str) -> Result<String> {
    Ok(validate_key(key)?.to_string_lossy().replace('\\', "/"))
}

/// Filesystem location of a blob under `base_dir`.
pub(crate) fn blob_path(base_dir: &Path, key: &str) -> Result<PathBuf> {
    Ok(base_dir.join(validate_key(key)?))
}
