//! Blob store collaborator for media files.
//!
//! A key-addressable store with `put`, `get`, `delete` and `exists`.
//! Supports multiple backends:
//!
//! - **FilesystemBlobBackend**: Files under a base directory (default for the CLI)
//! - **MemoryBlobBackend**: Non-persistent storage for tests and embedding
//!
//! Implement [`BlobBackend`] to plug in an object store.

mod backend;
mod filesystem;
mod memory;
mod service;
mod types;
mod validation;


pub use backend::BlobBackend;
pub use filesystem::FilesystemBlobBackend;
pub use memory::MemoryBlobBackend;
pub use service::BlobStore;
pub use types::BlobRef;
