use std::collections::BTreeMap;
use std::sync::Arc;

use stockwise_events::{EventBus, InMemoryEventBus, Subscription};
use tracing::warn;

use crate::filter::Filter;
use crate::sort::{SortKey, SortState, Sortable};

/// The output of one recompute.
#[derive(Debug, Clone)]
pub struct ViewSnapshot<T> {
    /// Bumped by every recompute.
    pub revision: u64,
    pub items: Arc<[T]>,
}

/// Base sequence + named AND-ed filters + one sort key, recomputed on every
/// input change.
///
/// Each setter recomputes synchronously before returning, then publishes a
/// [`ViewSnapshot`] to subscribers. The same inputs always give the same
/// output; ties keep base-sequence order in both directions.
pub struct FilteredView<T, K> {
    source: Vec<T>,
    filters: BTreeMap<&'static str, Filter<T>>,
    sort: SortState<K>,
    output: Arc<[T]>,
    revision: u64,
    notifier: InMemoryEventBus<ViewSnapshot<T>>,
}

impl<T, K> FilteredView<T, K>
where
    T: Clone + Sortable<K> + Send + Sync + 'static,
    K: SortKey,
{
    pub fn new(sort_key: K) -> Self {
        Self::with_sort(SortState::new(sort_key))
    }

    pub fn with_sort(sort: SortState<K>) -> Self {
        let mut view = Self {
            source: Vec::new(),
            filters: BTreeMap::new(),
            sort,
            output: Arc::from(Vec::new()),
            revision: 0,
            notifier: InMemoryEventBus::new(),
        };
        view.recompute();
        view
    }

    /// Replace the base sequence (e.g. a fresh collection read).
    pub fn set_source(&mut self, items: Vec<T>) {
        self.source = items;
        self.recompute();
    }

    /// Set one filter slot. Setting the sentinel clears the slot.
    pub fn set_filter(&mut self, slot: &'static str, filter: Filter<T>) {
        if filter.is_active() {
            self.filters.insert(slot, filter);
        } else {
            self.filters.remove(slot);
        }
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.recompute();
    }

    /// Column-header click: toggles on the active key, resets on a new one.
    pub fn sort_by(&mut self, key: K) {
        self.sort.select(key);
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortState<K>) {
        self.sort = sort;
        self.recompute();
    }

    pub fn sort(&self) -> SortState<K> {
        self.sort
    }

    pub fn items(&self) -> &[T] {
        &self.output
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.keys().copied()
    }

    pub fn snapshot(&self) -> ViewSnapshot<T> {
        ViewSnapshot {
            revision: self.revision,
            items: self.output.clone(),
        }
    }

    /// Receive a snapshot after every future recompute.
    pub fn subscribe(&self) -> Subscription<ViewSnapshot<T>> {
        self.notifier.subscribe()
    }

    fn recompute(&mut self) {
        let mut rows: Vec<T> = self
            .source
            .iter()
            .filter(|item| self.filters.values().all(|f| f.matches(item)))
            .cloned()
            .collect();
        let sort = self.sort;
        rows.sort_by(|a, b| sort.compare(a, b));

        self.output = Arc::from(rows);
        self.revision += 1;
        // The view itself is already updated; only subscribers miss out.
        if let Err(err) = self.notifier.publish(self.snapshot()) {
            warn!(?err, revision = self.revision, "view notification dropped");
        }
    }
}
