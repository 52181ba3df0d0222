use std::sync::Arc;

use chrono::{DateTime, Utc};

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// One filter slot value: either a predicate or the "no filter" sentinel.
///
/// The constructors map the UI's empty inputs (blank search text, `None`
/// selections and bounds) to the sentinel, so a cleared input simply drops
/// out of the AND.
pub struct Filter<T> {
    predicate: Option<Predicate<T>>,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
        }
    }
}

impl<T: 'static> core::fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Filter")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<T: 'static> Default for Filter<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: 'static> Filter<T> {
    /// The "no filter" sentinel.
    pub fn none() -> Self {
        Self { predicate: None }
    }

    pub fn new(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn matches(&self, item: &T) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(item))
    }

    /// Case-insensitive substring match on any of the given fields.
    pub fn text<F>(term: &str, fields: F) -> Self
    where
        F: Fn(&T) -> Vec<&str> + Send + Sync + 'static,
    {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Self::none();
        }
        Self::new(move |item| {
            fields(item)
                .into_iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
    }

    /// Exact match against a selected value.
    pub fn equals<V, F>(selected: Option<V>, field: F) -> Self
    where
        V: PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        match selected {
            None => Self::none(),
            Some(value) => Self::new(move |item| field(item) == value),
        }
    }

    /// Inclusive numeric range; either bound may be open.
    pub fn between<F>(min: Option<i64>, max: Option<i64>, field: F) -> Self
    where
        F: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        if min.is_none() && max.is_none() {
            return Self::none();
        }
        Self::new(move |item| {
            let v = field(item);
            min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m)
        })
    }

    /// Inclusive date range; either bound may be open.
    pub fn within<F>(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>, field: F) -> Self
    where
        F: Fn(&T) -> DateTime<Utc> + Send + Sync + 'static,
    {
        if from.is_none() && to.is_none() {
            return Self::none();
        }
        Self::new(move |item| {
            let d = field(item);
            from.is_none_or(|f| d >= f) && to.is_none_or(|t| d <= t)
        })
    }
}
