use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use stockwise_core::{Entity, ExpectedVersion};

use super::r#trait::{DocumentStore, OrderBy, StoreError, StoredDocument, WriteBatch};

/// A decoded document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub id: String,
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    /// Precondition for overwriting or deleting exactly what was read.
    pub fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::Exact(self.version)
    }
}

/// Typed handle on one collection of a [`DocumentStore`].
///
/// Reads go straight to the store; `put`/`delete` stage writes into a
/// caller-owned [`WriteBatch`] so several collections can be committed
/// together. `insert`/`replace`/`remove` are single-document shortcuts.
pub struct Collection<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Collection<T> {}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collection").field(&self.name).finish()
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub async fn get<S>(&self, store: &S, id: &str) -> Result<Option<Versioned<T>>, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        store
            .get(self.name, id)
            .await?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    pub async fn list<S>(
        &self,
        store: &S,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<Versioned<T>>, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        store
            .query(self.name, order_by)
            .await?
            .into_iter()
            .map(|doc| self.decode(doc))
            .collect()
    }

    pub fn put(
        &self,
        batch: &mut WriteBatch,
        id: &str,
        value: &T,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(value)
            .map_err(|e| StoreError::Serialization(format!("{}/{id}: {e}", self.name)))?;
        batch.put(self.name, id, body, expected);
        Ok(())
    }

    pub fn delete(&self, batch: &mut WriteBatch, id: &str, expected: ExpectedVersion) {
        batch.delete(self.name, id, expected);
    }

    /// Create a document that must not exist yet. Returns its version.
    pub async fn insert<S>(&self, store: &S, id: &str, value: &T) -> Result<u64, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        self.replace(store, id, value, ExpectedVersion::ABSENT).await
    }

    pub async fn replace<S>(
        &self,
        store: &S,
        id: &str,
        value: &T,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let mut batch = WriteBatch::new();
        self.put(&mut batch, id, value, expected)?;
        let receipt = store.commit(batch).await?;
        Ok(receipt.version_of(self.name, id).unwrap_or_default())
    }

    pub async fn remove<S>(&self, store: &S, id: &str, expected: ExpectedVersion) -> Result<(), StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let mut batch = WriteBatch::new();
        self.delete(&mut batch, id, expected);
        store.commit(batch).await?;
        Ok(())
    }

    fn decode(&self, doc: StoredDocument) -> Result<Versioned<T>, StoreError> {
        let value = serde_json::from_value(doc.body).map_err(|e| {
            StoreError::Serialization(format!("{}/{}: {e}", self.name, doc.id))
        })?;
        Ok(Versioned {
            id: doc.id,
            version: doc.version,
            value,
        })
    }
}

impl<T> Collection<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Stage `entity` under its own key.
    pub fn put_entity(
        &self,
        batch: &mut WriteBatch,
        entity: &T,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        self.put(batch, &entity.key(), entity, expected)
    }

    /// Create `entity` under its own key; it must not exist yet.
    pub async fn insert_entity<S>(&self, store: &S, entity: &T) -> Result<u64, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        self.insert(store, &entity.key(), entity).await
    }
}
