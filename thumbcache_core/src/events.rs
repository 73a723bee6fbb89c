//! Publish/subscribe bridge for progress and error notifications
//!
//! The bus is a registry of callbacks invoked synchronously on every
//! emission. Subscribing returns a [`Subscription`] handle which removes the
//! callback when it is dropped or explicitly unsubscribed. Named
//! subscriptions replace any earlier handler registered under the same key,
//! so a UI surface that re-registers never receives duplicate events.

use crate::progress::{GenerationProgress, PruneProgress, ThumbnailError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

/// A notification pushed to UI surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    ThumbnailProgress(GenerationProgress),
    ThumbnailError(ThumbnailError),
    CachePruneProgress(PruneProgress),
}

/// Event channel discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ThumbnailProgress,
    ThumbnailError,
    CachePruneProgress,
}

impl EventKind {
    /// Channel name as seen by UI subscribers
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThumbnailProgress => "thumbnail-progress",
            Self::ThumbnailError => "thumbnail-error",
            Self::CachePruneProgress => "cache-prune-progress",
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ThumbnailProgress(_) => EventKind::ThumbnailProgress,
            Self::ThumbnailError(_) => EventKind::ThumbnailError,
            Self::CachePruneProgress(_) => EventKind::CachePruneProgress,
        }
    }

    pub fn channel(&self) -> &'static str {
        self.kind().as_str()
    }
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Entry {
    id: u64,
    key: Option<String>,
    filter: Option<EventKind>,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Registry {
    fn insert(&mut self, key: Option<String>, filter: Option<EventKind>, callback: Callback) -> u64 {
        if let Some(key) = &key {
            self.entries
                .retain(|entry| entry.key.as_deref() != Some(key.as_str()));
        }

        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(Entry {
            id,
            key,
            filter,
            callback,
        });
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }
}

/// Registry of event subscribers
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(None, None, Arc::new(callback))
    }

    /// Receive events of one kind only
    pub fn subscribe_to<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(None, Some(kind), Arc::new(callback))
    }

    /// Register under `key`, removing any handler previously registered
    /// under the same key
    pub fn subscribe_named<F>(&self, key: &str, kind: Option<EventKind>, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(Some(key.to_string()), kind, Arc::new(callback))
    }

    /// Deliver `event` to every matching subscriber
    ///
    /// Callbacks run on the emitting task after the registry lock has been
    /// released, so a callback may subscribe or unsubscribe freely.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let callbacks: Vec<Callback> = self
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.filter.is_none_or(|filter| filter == kind))
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn register(&self, key: Option<String>, filter: Option<EventKind>, callback: Callback) -> Subscription {
        let id = self.lock().insert(key, filter, callback);
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a registered callback
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep
/// the callback registered for the lifetime of the bus.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the callback from the bus
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    /// Keep the callback registered until the bus itself is dropped
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(self.id);
        }
    }
}

/// Forward every bus event into a bounded channel
///
/// Events are sent with `try_send`: a full channel drops the event rather
/// than blocking the emitter. The channel closes once the returned
/// subscription is dropped.
pub fn channel_bridge(bus: &EventBus, capacity: usize) -> (Subscription, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let subscription = bus.subscribe(move |event| {
        let _ = tx.try_send(event.clone());
    });
    (subscription, rx)
}
