//! Publish/subscribe abstraction for committed ledger events.
//!
//! Publication always happens **after** the append it describes has been
//! committed; the ledger is the source of truth and the bus is only for
//! distribution. Delivery is at-least-once, so consumers must tolerate
//! duplicates (the envelope's sequence number makes that cheap).

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to a bus (broadcast: every subscriber sees every message).
///
/// Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message; errors once the bus is gone.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic event bus.
///
/// `publish()` failures are surfaced to the caller; the entry is already
/// committed at that point, so the caller decides whether to retry publication.
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

/// Bus that drops every message. Used when nobody listens for ledger events.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingBus;

impl<M> EventBus<M> for DiscardingBus {
    type Error = core::convert::Infallible;

    fn publish(&self, _message: M) -> Result<(), Self::Error> {
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        // Sender is dropped immediately: the subscription reports disconnection.
        let (_tx, rx) = std::sync::mpsc::channel();
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarding_bus_accepts_and_disconnects() {
        let bus = DiscardingBus;
        let sub: Subscription<u8> = bus.subscribe();
        assert!(bus.publish(1u8).is_ok());
        assert!(sub.recv().is_err());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn arc_bus_forwards_to_inner() {
        let bus = Arc::new(crate::InMemoryEventBus::<u8>::new());
        let sub = bus.subscribe();
        EventBus::publish(&bus, 4).unwrap();
        assert_eq!(sub.recv().unwrap(), 4);
    }
}
