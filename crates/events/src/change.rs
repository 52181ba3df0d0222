use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// Notification that one document of a collection was written by a committed
/// batch.
///
/// All changes of one batch share `batch_id` and `committed_at`; they are
/// published after the commit, in op order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionChange {
    collection: String,
    document_id: String,
    kind: ChangeKind,
    /// Document version after the write (0 for deletions).
    version: u64,
    batch_id: u64,
    committed_at: DateTime<Utc>,
}

impl CollectionChange {
    pub fn new(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        kind: ChangeKind,
        version: u64,
        batch_id: u64,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind,
            version,
            batch_id,
            committed_at,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }
}
