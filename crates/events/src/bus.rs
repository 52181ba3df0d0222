//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus distributes notifications to every subscriber (broadcast
//! semantics). It is not a store: a subscriber that was not listening when a
//! notification went out does not get it later. Consumers treat a
//! notification as "something changed, re-read" rather than as the change
//! itself, so duplicates are harmless.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// A subscription to a notification stream.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(change) = subscription.try_recv() {
///     refresh(change.collection());
/// }
/// ```
///
/// Subscriptions are meant for a single consumer. Messages arrive in the order
/// the bus published them.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Next queued message, if any.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything queued right now without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `publish` may fail (e.g. poisoned lock); the failure is surfaced to the
/// caller. Stores publish only after a commit succeeded, so a failed publish
/// never means a lost write.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
