//! Types for the blob store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque pointer to a stored blob (e.g. `stories/6f1c....jpg`).
///
/// Produced by [`BlobStore::put`](super::BlobStore::put) and persisted on
/// the records that own the blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobRef {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for BlobRef {
    fn from(key: String) -> Self {
        Self(key)
    }
}
