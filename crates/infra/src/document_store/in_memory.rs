use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use stockwise_events::{ChangeKind, CollectionChange, EventBus, InMemoryEventBus, Subscription};

use super::r#trait::{
    CommitReceipt, DocumentStore, OrderBy, StoreError, StoredDocument, WriteBatch, WriteOp,
    WrittenVersion,
};

#[derive(Debug, Clone)]
struct Entry {
    version: u64,
    body: JsonValue,
}

/// Test hooks consumed by the next commit.
#[derive(Debug, Default)]
struct Faults {
    fail_next: Option<String>,
    interleaved: VecDeque<WriteBatch>,
}

/// In-memory document store.
///
/// Intended for tests/dev. Publishes one [`CollectionChange`] per written
/// document after each successful commit.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Entry>>>,
    last_batch: AtomicU64,
    changes: InMemoryEventBus<CollectionChange>,
    faults: Mutex<Faults>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change feed; only changes committed after this call are delivered.
    pub fn changes(&self) -> Subscription<CollectionChange> {
        self.changes.subscribe()
    }

    /// Make the next commit fail with [`StoreError::Unavailable`].
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.fail_next = Some(reason.into());
        }
    }

    /// Simulate another writer: `batch` is committed right before the next
    /// caller's batch is checked. Queued batches are consumed one per commit.
    pub fn interleave_before_next_commit(&self, batch: WriteBatch) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.interleaved.push_back(batch);
        }
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn apply(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        {
            let mut seen = HashSet::new();
            for op in batch.ops() {
                if !seen.insert((op.collection(), op.id())) {
                    return Err(StoreError::InvalidBatch(format!(
                        "{}/{} written twice in one batch",
                        op.collection(),
                        op.id()
                    )));
                }
            }
        }

        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;

        // Check every precondition before touching anything.
        for op in batch.ops() {
            let actual = collections
                .get(op.collection())
                .and_then(|docs| docs.get(op.id()))
                .map_or(0, |e| e.version);
            let expected = op.expected();
            if !expected.matches(actual) {
                return Err(StoreError::Conflict {
                    collection: op.collection().to_string(),
                    id: op.id().to_string(),
                    expected,
                    actual,
                });
            }
        }

        let batch_id = self.last_batch.fetch_add(1, Ordering::SeqCst) + 1;
        let committed_at = Utc::now();
        let mut written = Vec::with_capacity(batch.len());
        let mut notifications = Vec::with_capacity(batch.len());

        for op in batch.into_ops() {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    body,
                    ..
                } => {
                    let docs = collections.entry(collection.clone()).or_default();
                    let version = docs.get(&id).map_or(0, |e| e.version) + 1;
                    docs.insert(id.clone(), Entry { version, body });
                    notifications.push(CollectionChange::new(
                        collection.clone(),
                        id.clone(),
                        ChangeKind::Upserted,
                        version,
                        batch_id,
                        committed_at,
                    ));
                    written.push(WrittenVersion {
                        collection,
                        id,
                        version,
                    });
                }
                WriteOp::Delete { collection, id, .. } => {
                    let removed = collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.remove(&id))
                        .is_some();
                    if removed {
                        notifications.push(CollectionChange::new(
                            collection.clone(),
                            id.clone(),
                            ChangeKind::Deleted,
                            0,
                            batch_id,
                            committed_at,
                        ));
                    }
                    written.push(WrittenVersion {
                        collection,
                        id,
                        version: 0,
                    });
                }
            }
        }
        drop(collections);

        debug!(batch_id, writes = written.len(), "batch committed");

        // Publish only after the batch is durable.
        for change in notifications {
            if let Err(err) = self.changes.publish(change) {
                warn!(?err, batch_id, "change notification dropped");
            }
        }

        Ok(CommitReceipt {
            batch_id,
            committed_at,
            written,
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|e| StoredDocument {
                collection: collection.to_string(),
                id: id.to_string(),
                version: e.version,
                body: e.body.clone(),
            }))
    }

    async fn query(
        &self,
        collection: &str,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let mut docs: Vec<StoredDocument> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, e)| StoredDocument {
                        collection: collection.to_string(),
                        id: id.clone(),
                        version: e.version,
                        body: e.body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if let Some(order) = order_by {
            // Stable sort over id-ordered input keeps id as the tie-break.
            docs.sort_by(|a, b| {
                order.direction.apply(compare_json(
                    a.body.get(&order.field),
                    b.body.get(&order.field),
                ))
            });
        }
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        let (interleaved, failure) = {
            let mut faults = self.faults.lock().map_err(|_| StoreError::Poisoned)?;
            (faults.interleaved.pop_front(), faults.fail_next.take())
        };

        if let Some(other) = interleaved {
            self.apply(other)?;
        }
        if let Some(reason) = failure {
            return Err(StoreError::Unavailable(reason));
        }

        self.apply(batch)
    }
}

/// Missing/null first, then booleans, numbers, strings; other JSON kinds
/// compare equal.
fn compare_json(a: Option<&JsonValue>, b: Option<&JsonValue>) -> CmpOrdering {
    fn rank(v: Option<&JsonValue>) -> u8 {
        match v {
            None | Some(JsonValue::Null) => 0,
            Some(JsonValue::Bool(_)) => 1,
            Some(JsonValue::Number(_)) => 2,
            Some(JsonValue::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(CmpOrdering::Equal),
        },
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
