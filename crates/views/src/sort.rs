use core::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Direction of the active sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A comparable projection of one field.
///
/// Missing values are folded to `""` / `0` by the constructors, so they sort
/// first in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Text(String),
    Number(i64),
}

impl SortValue {
    pub fn text(value: Option<&str>) -> Self {
        SortValue::Text(value.unwrap_or_default().to_string())
    }

    pub fn number(value: Option<i64>) -> Self {
        SortValue::Number(value.unwrap_or(0))
    }

    /// Collated for text, numeric for numbers. Text sorts after numbers if a
    /// key ever mixes them.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => collate(a, b),
            (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// Three-level text collation: base letters ignoring case and accents,
/// then accents (unaccented first), then case (lowercase first).
pub fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Lowercased canonical decomposition.
fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    folded(s).filter(|c| !is_combining_mark(*c))
}

/// A field a list can be sorted by.
pub trait SortKey: Copy + Eq + core::fmt::Debug {
    /// Direction used when this key becomes active. Date-like keys override
    /// this to `Descending`.
    fn default_direction(self) -> SortDirection {
        SortDirection::Ascending
    }
}

/// Entities that expose a [`SortValue`] for every key of `K`.
pub trait Sortable<K: SortKey> {
    fn sort_value(&self, key: K) -> SortValue;
}

/// The active sort key and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    key: K,
    direction: SortDirection,
}

impl<K: SortKey> SortState<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            direction: key.default_direction(),
        }
    }

    pub fn with_direction(key: K, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn key(&self) -> K {
        self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Column-header click: same key toggles, another key starts over at
    /// that key's default direction.
    pub fn select(&mut self, key: K) {
        if key == self.key {
            self.direction = self.direction.toggled();
        } else {
            *self = Self::new(key);
        }
    }

    pub fn compare<T: Sortable<K>>(&self, a: &T, b: &T) -> Ordering {
        self.direction
            .apply(a.sort_value(self.key).compare(&b.sort_value(self.key)))
    }
}
