//! EventBus - store notifications observed by the index machinery
//!
//! Subscribers register a callback and receive every published event until
//! they unsubscribe. Publication is synchronous: callbacks run on the
//! publishing thread, one at a time.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Events published by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Revisions of a document were physically removed
    DocumentPurged {
        doc_id: String,
        purged_rev_ids: Vec<String>,
    },
}

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Synchronous callback registry for store events.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Callback>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for every future event.
    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .insert(id, Box::new(callback));
        Subscription(id)
    }

    /// Removes a subscription. Returns false when it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .remove(&subscription.0)
            .is_some()
    }

    /// Delivers an event to every subscriber.
    pub fn publish(&self, event: &StoreEvent) {
        let subscribers = self.subscribers.lock().expect("event bus lock poisoned");
        for callback in subscribers.values() {
            callback(event);
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .len()
    }
}

// Callbacks are not Debug; report the subscriber count only.
impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
