//! Typed publish/subscribe.
//!
//! Pages (or any other observer) subscribe to [`WorkerEvent`]s through an
//! [`EventBus`]. Each subscriber gets its own unbounded channel; the
//! returned [`Subscription`] unsubscribes when dropped or on
//! [`Subscription::unsubscribe`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use crate::models::{Notification, SyncTag};

/// Lifecycle and background notifications published by the cache manager.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Every manifest file was cached; the version is waiting to activate.
    Installed { version: String },
    InstallFailed { version: String, reason: String },
    Activated { version: String },
    /// Open pages are now controlled by the active version.
    ClientsClaimed { version: String },
    PartitionDeleted { name: String },
    SyncCompleted { tag: SyncTag, sent: usize },
    SyncFailed { tag: SyncTag, reason: String },
    NotificationShown(Notification),
}

struct Inner<E> {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<E>>,
    closed: bool,
}

fn lock<E>(inner: &Mutex<Inner<E>>) -> MutexGuard<'_, Inner<E>> {
    // A panic while holding the lock cannot leave the map inconsistent
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct EventBus<E> {
    inner: Arc<Mutex<Inner<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                subscribers: HashMap::new(),
                closed: false,
            })),
        }
    }

    /// Register a new subscriber. On a closed bus the subscription is
    /// already finished and yields nothing.
    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        if !inner.closed {
            inner.subscribers.insert(id, tx);
        }
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: E) -> usize {
        let mut inner = lock(&self.inner);
        inner
            .subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Drop every subscriber; pending events can still be drained.
    pub fn close(&self) {
        let mut inner = lock(&self.inner);
        inner.closed = true;
        inner.subscribers.clear();
    }
}

pub struct Subscription<E> {
    id: u64,
    rx: mpsc::UnboundedReceiver<E>,
    bus: Weak<Mutex<Inner<E>>>,
}

impl<E> Subscription<E> {
    /// Wait for the next event. `None` once unsubscribed or the bus closed.
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<E> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            lock(&inner).subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let delivered = bus.publish(WorkerEvent::Activated { version: "v2".into() });

        assert_eq!(delivered, 2);
        assert_eq!(a.recv().await, Some(WorkerEvent::Activated { version: "v2".into() }));
        assert_eq!(b.recv().await, Some(WorkerEvent::Activated { version: "v2".into() }));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus: EventBus<u32> = EventBus::new();
        let sub = bus.subscribe();
        let mut kept = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(7), 1);
        assert_eq!(kept.try_recv(), Some(7));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let bus: EventBus<u32> = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(1);
        bus.close();

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, None);
        assert_eq!(bus.publish(2), 0);

        let mut late = bus.subscribe();
        assert_eq!(late.recv().await, None);
    }

    #[test]
    fn test_drain() {
        let bus: EventBus<&'static str> = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish("a");
        bus.publish("b");
        assert_eq!(sub.drain(), vec!["a", "b"]);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus: EventBus<u8> = EventBus::new();
        let sub = bus.subscribe();
        drop(bus);
        drop(sub);
    }
}
