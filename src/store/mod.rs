//! Document store collaborator with pluggable backends.
//!
//! The engagement components persist everything through this narrow
//! interface: create, point lookup, filtered find with sort/skip/limit,
//! atomic counter increments, compare-and-swap, and a conditional
//! "delete if still present, return prior value" primitive. Supports
//! multiple backends:
//!
//! - **RedbDocumentBackend**: Persistent storage with ACID guarantees (default for the CLI)
//! - **MemoryDocumentBackend**: Fast, non-persistent storage (ideal for testing/embedding)
//!
//! # Example
//!
//! ```ignore
//! use plaza::store::{DocumentStore, Filter, Query, Order};
//!
//! let store = DocumentStore::memory();
//! store.insert("posts", "p1", &post).await?;
//! let recent: Vec<Post> = store
//!     .find(
//!         "posts",
//!         &Query::new(Filter::eq("owner_id", "alice"))
//!             .sort("created_at", Order::Desc)
//!             .limit(10),
//!     )
//!     .await?;
//! ```
//!
//! # Custom Backends
//!
//! Implement the `DocumentBackend` trait to back the store with a networked
//! document database:
//!
//! ```ignore
//! use plaza::store::{DocumentBackend, DocumentStore};
//!
//! struct MongoBackend { /* ... */ }
//! impl DocumentBackend for MongoBackend { /* ... */ }
//!
//! let store = DocumentStore::custom(MongoBackend::new());
//! ```

mod backend;
mod memory;
mod query;
mod redb;
mod store;


// Re-export the public API
pub use backend::{CounterUpdate, DocumentBackend};
pub use memory::MemoryDocumentBackend;
pub use query::{Filter, Order, Query};
pub use redb::RedbDocumentBackend;
pub use store::DocumentStore;
