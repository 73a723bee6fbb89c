//! Thumbnail Cache Core Library
//!
//! This is the core library for the thumbnail cache, providing bounded
//! concurrent thumbnail generation with pause/resume/cancel, a TTL and
//! size-capped eviction engine, persisted policy settings and a
//! request/response service boundary with event broadcasting.

pub mod error;
pub mod events;
pub mod eviction;
pub mod paths;
pub mod policy;
pub mod progress;
pub mod runner;
pub mod service;
pub mod thumbnail;

// Re-export main types
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventKind, Subscription, channel_bridge};
pub use eviction::{
    CacheEntry, CacheInfo, ClearOutcome, PruneOptions, PruneOutcome, clear_cache, get_cache_info,
    prune_cache, scan_cache,
};
pub use paths::AppPaths;
pub use policy::{
    CachePolicy, PolicyStore, ThumbnailConfig, ThumbnailConfigStore, load_policy,
    load_thumbnail_config, save_policy, save_thumbnail_config,
};
pub use progress::{
    GenerationProgress, GenerationStatus, PrunePhase, PruneProgress, ThumbnailError,
};
pub use runner::{TaskProgress, run_with_concurrency, run_with_concurrency_and_progress};
pub use service::{
    AutoPruneHandle, ControlAck, Reply, Request, ServiceOptions, StartAck, ThumbnailService,
};
#[cfg(feature = "image")]
pub use thumbnail::ImageGenerator;
pub use thumbnail::{
    PipelineOptions, SidecarGenerator, ThumbnailGenerator, ThumbnailPipeline, ThumbnailStore,
};
