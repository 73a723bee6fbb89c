//! Progress reporting for the CLI
//!
//! The core service publishes on an [`EventBus`]; [`attach`] bridges it into
//! a channel consumed by a rendering task.

pub mod renderer;
pub mod utils;

pub use renderer::{ProgressRenderer, describe_prune, render_events};
pub use utils::{days_to_seconds, format_bytes, format_duration, format_eta, mb_to_bytes};

use thumbcache_core::{EventBus, Subscription, channel_bridge};
use tokio::task::JoinHandle;

/// Events buffered between the bus and the renderer
const EVENT_BUFFER: usize = 1024;

/// A renderer task subscribed to a bus
pub struct ProgressHandle {
    subscription: Subscription,
    task: JoinHandle<usize>,
}

/// Start rendering `bus` events on stderr
pub fn attach(bus: &EventBus, show_bars: bool) -> ProgressHandle {
    let (subscription, rx) = channel_bridge(bus, EVENT_BUFFER);
    let task = tokio::spawn(render_events(rx, show_bars));
    ProgressHandle { subscription, task }
}

impl ProgressHandle {
    /// Unsubscribe, drain what was already sent and return the error count
    pub async fn finish(self) -> usize {
        self.subscription.unsubscribe();
        match self.task.await {
            Ok(errors) => errors,
            Err(e) => {
                log::warn!("Progress renderer ended abnormally: {e}");
                0
            }
        }
    }
}
