//! Filtered list views.
//!
//! [`FilteredView`] is the one list pipeline every screen uses: a base
//! sequence, named filter slots combined with AND, and a single active sort
//! key. Any input change recomputes the output synchronously and notifies
//! subscribers. No IO happens here; feeding the base sequence from the store
//! is the caller's job.

pub mod filter;
pub mod pipeline;
pub mod screens;
pub mod sort;

pub use filter::Filter;
pub use pipeline::{FilteredView, ViewSnapshot};
pub use sort::{SortDirection, SortKey, SortState, SortValue, Sortable};
