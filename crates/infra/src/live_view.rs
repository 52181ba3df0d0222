//! Store-backed list screens.
//!
//! A [`LiveView`] feeds a [`FilteredView`] from one collection and reloads
//! it whenever the store reports a committed change to that collection.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use stockwise_events::{CollectionChange, Subscription};
use stockwise_views::{FilteredView, SortKey, Sortable};

use crate::document_store::{Collection, DocumentStore, OrderBy, StoreError};

pub struct LiveView<T, K, S> {
    store: S,
    collection: Collection<T>,
    order_by: Option<OrderBy>,
    changes: Subscription<CollectionChange>,
    view: FilteredView<T, K>,
}

impl<T, K, S> LiveView<T, K, S>
where
    T: Serialize + DeserializeOwned + Clone + Sortable<K> + Send + Sync + 'static,
    K: SortKey,
    S: DocumentStore,
{
    /// Bind `view` to `collection` and load it once.
    ///
    /// `changes` should be subscribed before this call so nothing committed
    /// in between is missed.
    pub async fn open(
        store: S,
        changes: Subscription<CollectionChange>,
        collection: Collection<T>,
        order_by: Option<OrderBy>,
        view: FilteredView<T, K>,
    ) -> Result<Self, StoreError> {
        let mut live = Self {
            store,
            collection,
            order_by,
            changes,
            view,
        };
        live.refresh().await?;
        Ok(live)
    }

    /// Reload the base sequence from the store.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let items = self
            .collection
            .list(&self.store, self.order_by.clone())
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect();
        self.view.set_source(items);
        Ok(())
    }

    /// Apply pending change notifications. Returns `true` if the collection
    /// changed and the view was reloaded.
    pub async fn sync(&mut self) -> Result<bool, StoreError> {
        let relevant = self
            .changes
            .drain()
            .iter()
            .filter(|c| c.collection() == self.collection.name())
            .count();
        if relevant == 0 {
            return Ok(false);
        }

        debug!(collection = self.collection.name(), changes = relevant, "reloading view");
        self.refresh().await?;
        Ok(true)
    }

    pub fn view(&self) -> &FilteredView<T, K> {
        &self.view
    }

    /// Filter/sort controls. Changes recompute synchronously.
    pub fn view_mut(&mut self) -> &mut FilteredView<T, K> {
        &mut self.view
    }
}
