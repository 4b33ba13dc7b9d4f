use super::types::{EventFilter, RoomEvent};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Default per-subscriber queue capacity.
pub const DEFAULT_CAPACITY: usize = 64;

struct Subscriber {
    filter: EventFilter,
    sender: mpsc::Sender<RoomEvent>,
}

struct Registry {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: DashMap<u64, Subscriber>,
}

/// Process-wide subscriber registry.
///
/// Created once at startup and shared by cloning; clones refer to the same
/// registry.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.registry.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    /// Create an EventBus whose subscribers each buffer `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                subscribers: DashMap::new(),
            }),
        }
    }

    /// Register a subscriber. It is removed when the returned handle drops.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.registry.capacity);

        self.registry
            .subscribers
            .insert(id, Subscriber { filter, sender });
        debug!(subscriber = id, "Event subscriber registered");

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every matching subscriber without blocking.
    ///
    /// Returns the number of subscribers that accepted the event. Subscribers
    /// with a full queue miss it; closed ones are pruned.
    pub fn publish(&self, event: RoomEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.registry.subscribers.iter() {
            if !entry.filter.matches(&event) {
                continue;
            }
            match entry.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = *entry.key(), "Subscriber queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        for id in closed {
            self.registry.subscribers.remove(&id);
        }

        delivered
    }

    /// Get the current number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription; unregisters itself on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<RoomEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Subscriber identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        self.receiver.recv().await
    }

    /// Take an event if one is queued.
    pub fn try_recv(&mut self) -> Option<RoomEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.remove(&self.id);
            debug!(subscriber = self.id, "Event subscriber removed");
        }
    }
}
