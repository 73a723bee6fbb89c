//! Event recording for assertions on emitted notifications

use std::sync::{Arc, Mutex};
use thumbcache_core::{
    Event, EventBus, GenerationProgress, PruneProgress, Subscription, ThumbnailError,
};

/// Records every event published on a bus
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
    _subscription: Subscription,
}

impl EventRecorder {
    /// Start recording; recording stops when the recorder is dropped
    pub fn attach(bus: &EventBus) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscription = bus.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn progress(&self) -> Vec<GenerationProgress> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::ThumbnailProgress(progress) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ThumbnailError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::ThumbnailError(error) => Some(error),
                _ => None,
            })
            .collect()
    }

    pub fn prune_progress(&self) -> Vec<PruneProgress> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::CachePruneProgress(progress) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn last_progress(&self) -> Option<GenerationProgress> {
        self.progress().pop()
    }
}
