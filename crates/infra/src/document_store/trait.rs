use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockwise_core::ExpectedVersion;
use stockwise_views::SortDirection;

/// A document as read back from the store.
///
/// `version` starts at 1 on first write and grows by one on every
/// overwrite. A document that does not exist has version 0.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub collection: String,
    pub id: String,
    pub version: u64,
    pub body: JsonValue,
}

/// One write inside a [`WriteBatch`], guarded by a version precondition.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: String,
        id: String,
        body: JsonValue,
        expected: ExpectedVersion,
    },
    Delete {
        collection: String,
        id: String,
        expected: ExpectedVersion,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }

    pub fn expected(&self) -> ExpectedVersion {
        match self {
            WriteOp::Put { expected, .. } | WriteOp::Delete { expected, .. } => *expected,
        }
    }
}

/// An all-or-nothing group of writes.
///
/// A batch may touch any number of documents across collections, but each
/// document at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        body: JsonValue,
        expected: ExpectedVersion,
    ) -> &mut Self {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            body,
            expected,
        });
        self
    }

    pub fn delete(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        expected: ExpectedVersion,
    ) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
            expected,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Resulting version of one document written by a batch (0 after a delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenVersion {
    pub collection: String,
    pub id: String,
    pub version: u64,
}

/// Proof of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Store-wide, strictly increasing commit sequence.
    pub batch_id: u64,
    pub committed_at: DateTime<Utc>,
    pub written: Vec<WrittenVersion>,
}

impl CommitReceipt {
    pub fn version_of(&self, collection: &str, id: &str) -> Option<u64> {
        self.written
            .iter()
            .find(|w| w.collection == collection && w.id == id)
            .map(|w| w.version)
    }
}

/// Ordering for a collection read, by one top-level field of the document.
///
/// Documents missing the field sort first in ascending order. Ties fall
/// back to the document id so reads are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Document store operation error.
///
/// These are storage failures, as opposed to domain errors (validation,
/// invariants).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A write precondition did not hold; nothing in the batch was applied.
    #[error("version conflict on {collection}/{id}: expected {expected:?}, found {actual}")]
    Conflict {
        collection: String,
        id: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend rejected the operation (connectivity, quota, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("invalid batch: {0}")]
    InvalidBatch(String),
}

/// Versioned JSON document store with atomic multi-document batches.
///
/// Implementations must:
/// - check every precondition of a batch before applying any of its writes
/// - apply a batch completely or not at all
/// - bump a document's version by one on every put
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Single-document read. `None` if the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Read a whole collection, ordered by `order_by` (or by id when `None`).
    async fn query(
        &self,
        collection: &str,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Atomically apply a batch.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).query(collection, order_by).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        (**self).commit(batch).await
    }
}
