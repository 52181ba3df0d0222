//! Change notifications: what the document store publishes after a commit and
//! what list screens subscribe to.

pub mod bus;
pub mod change;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeKind, CollectionChange};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
