use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::events::{Event, EventPayload};

/// Opaque handle returned by `subscribe`. Scoped to the issuing bus and
/// never reused within its lifetime.
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

struct Registry {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Callback)>,
}

/// Publish/subscribe dispatcher for one ordered subscriber list.
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 1,
                entries: Vec::new(),
            }),
        }
    }

    /// Register a callback invoked for every published event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(callback)));
        id
    }

    /// Register a callback invoked only when the published event carries a
    /// payload of type `P`. Internally wrapped as a generic callback that
    /// inspects the variant.
    pub fn subscribe_to<P, F>(&self, callback: F) -> SubscriptionId
    where
        P: EventPayload + 'static,
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let Some(payload) = P::from_event(event) {
                callback(payload);
            }
        })
    }

    /// Remove the subscription with the given handle. Unknown handles are
    /// silently ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.lock().entries.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Deliver the event to every registered subscriber, in registration
    /// order, on the calling thread. The subscriber list is copied under
    /// the lock and the callbacks run unlocked, so reentrant bus calls
    /// from inside a callback cannot deadlock.
    pub fn publish(&self, event: &Event) {
        let callbacks: Vec<Callback> = {
            let registry = self.registry.lock();
            registry.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().entries.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
