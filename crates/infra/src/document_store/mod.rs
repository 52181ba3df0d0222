//! Versioned document store boundary.
//!
//! Documents are JSON bodies keyed by `(collection, id)`. Writes go through
//! atomic [`WriteBatch`]es whose ops each carry an `ExpectedVersion`, which
//! is what the reconciliation flows use as their compare-and-swap primitive.

pub mod collection;
pub mod in_memory;
pub mod r#trait;

pub use collection::{Collection, Versioned};
pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{
    CommitReceipt, DocumentStore, OrderBy, StoreError, StoredDocument, WriteBatch, WriteOp,
    WrittenVersion,
};
