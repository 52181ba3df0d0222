//! Identity of stored documents.

use core::fmt::{Debug, Display};
use core::hash::Hash;

/// A document with an identity of its own.
///
/// Products, movement records and purchase orders are entities: the id is
/// their document key, and two documents with the same id are the same
/// thing whatever their field values.
pub trait Entity {
    type Id: Copy + Eq + Hash + Debug + Display;

    fn id(&self) -> &Self::Id;

    /// Document key, the display form of the id.
    fn key(&self) -> String {
        self.id().to_string()
    }
}
