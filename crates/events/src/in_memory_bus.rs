//! Process-local event bus.

use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard, mpsc};

use crate::bus::{EventBus, Subscription};

/// Fans every ledger event out to all live subscriptions over
/// `std::sync::mpsc` channels.
///
/// Senders whose subscription was dropped are pruned on the next publish.
/// Publishing never fails: a poisoned lock still holds a valid sender list.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn senders(&self) -> MutexGuard<'_, Vec<mpsc::Sender<M>>> {
        self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = Infallible;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.senders().retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.senders().push(tx);
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_message() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7).unwrap();
        bus.publish(8).unwrap();

        assert_eq!(a.drain(), vec![7, 8]);
        assert_eq!(b.drain(), vec![7, 8]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.senders().len(), 2);

        bus.publish(1).unwrap();
        assert_eq!(kept.drain(), vec![1]);
        assert_eq!(bus.senders().len(), 1);
    }

    #[test]
    fn poisoned_lock_still_delivers() {
        let bus: std::sync::Arc<InMemoryEventBus<u32>> = std::sync::Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();

        let poisoner = bus.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.senders.lock().unwrap();
            panic!("poison the bus");
        })
        .join();

        assert!(bus.senders.is_poisoned());
        bus.publish(3).unwrap();
        assert_eq!(sub.drain(), vec![3]);
    }
}
