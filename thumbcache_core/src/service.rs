//! Request/response boundary for UI surfaces
//!
//! [`ThumbnailService`] bundles a pipeline, the eviction engine and both
//! settings stores behind one handle built from explicit [`AppPaths`]. Every
//! operation answers with a [`Reply`], serialized as `{"ok": true, "data": ..}`
//! or `{"ok": false, "error": ".."}`. Asynchronous progress goes out on the
//! service's [`EventBus`].

use crate::error::{Error, Result, ValidationError};
use crate::events::{Event, EventBus};
use crate::eviction::{
    CacheInfo, ClearOutcome, PruneOptions, PruneOutcome, clear_cache, get_cache_info, prune_cache,
};
use crate::paths::AppPaths;
use crate::policy::{CachePolicy, PolicyStore, ThumbnailConfig, ThumbnailConfigStore};
use crate::progress::GenerationProgress;
use crate::thumbnail::{
    PipelineOptions, SidecarGenerator, ThumbnailGenerator, ThumbnailPipeline, ThumbnailStore,
};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Default minimum spacing between two non-forced prunes
pub const DEFAULT_MIN_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Uniform boundary result
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    Err(String),
}

impl<T> Reply<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ok(data) => Some(data),
            Self::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Err(error) => Some(error),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            Self::Ok(data) => Ok(data),
            Self::Err(error) => Err(error),
        }
    }
}

impl<T: Serialize> Reply<T> {
    /// Erase the payload type for transport
    pub fn into_json(self) -> Reply<serde_json::Value> {
        match self {
            Self::Ok(data) => match serde_json::to_value(data) {
                Ok(value) => Reply::Ok(value),
                Err(e) => Reply::Err(Error::from(e).to_string()),
            },
            Self::Err(error) => Reply::Err(error),
        }
    }
}

impl<T> From<Result<T>> for Reply<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Ok(data),
            Err(e) => Self::Err(e.to_string()),
        }
    }
}

impl<T: Serialize> Serialize for Reply<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Ok(data) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("data", data)?;
            }
            Self::Err(error) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

/// A request as received from a UI surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Request {
    Start { paths: Vec<PathBuf> },
    Pause,
    Resume,
    Cancel,
    Progress,
    Prune {
        #[serde(default)]
        force: bool,
    },
    GetInfo,
    GetPolicy,
    SetPolicy { policy: CachePolicy },
    Clear,
    GetConfig,
    SetConfig { config: ThumbnailConfig },
}

/// Reply payload of `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    pub queued: usize,
}

/// Reply payload of `pause`, `resume` and `cancel`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAck {
    /// Whether the request changed the run state
    pub changed: bool,
    pub progress: GenerationProgress,
}

/// Tunables of the service itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Non-forced prunes closer than this to the last completed one are skipped
    pub min_prune_interval: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            min_prune_interval: DEFAULT_MIN_PRUNE_INTERVAL,
        }
    }
}

struct Inner {
    paths: AppPaths,
    bus: EventBus,
    pipeline: ThumbnailPipeline,
    policy_store: PolicyStore,
    config_store: ThumbnailConfigStore,
    options: ServiceOptions,
    /// Serializes prune and clear; holds when the last prune completed
    last_prune: Mutex<Option<Instant>>,
}

/// Thumbnail cache facade
#[derive(Clone)]
pub struct ThumbnailService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ThumbnailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailService")
            .field("paths", &self.inner.paths)
            .field("options", &self.inner.options)
            .finish()
    }
}

impl ThumbnailService {
    pub fn new(
        paths: AppPaths,
        generator: Arc<dyn ThumbnailGenerator>,
        options: ServiceOptions,
    ) -> Self {
        let bus = EventBus::new();
        let policy_store = PolicyStore::at_path(paths.policy_path());
        let config_store = ThumbnailConfigStore::at_path(paths.thumbnail_config_path());
        let pipeline = ThumbnailPipeline::new(
            ThumbnailStore::new(&paths.cache_dir),
            generator,
            bus.clone(),
            PipelineOptions::from(config_store.load()),
        );

        Self {
            inner: Arc::new(Inner {
                paths,
                bus,
                pipeline,
                policy_store,
                config_store,
                options,
                last_prune: Mutex::new(None),
            }),
        }
    }

    /// Service writing side-car artifacts with default options
    pub fn with_sidecar(paths: AppPaths) -> Self {
        Self::new(paths, Arc::new(SidecarGenerator), ServiceOptions::default())
    }

    pub fn paths(&self) -> &AppPaths {
        &self.inner.paths
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn pipeline(&self) -> &ThumbnailPipeline {
        &self.inner.pipeline
    }

    /// Generate thumbnails and wait for the run to settle
    pub async fn run(&self, paths: Vec<PathBuf>) -> GenerationProgress {
        let pipeline = &self.inner.pipeline;
        pipeline.set_concurrency(self.inner.config_store.load().concurrency);
        pipeline.generate(paths).await
    }

    /// Start a run in the background and reply immediately
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, paths: Vec<PathBuf>) -> Reply<StartAck> {
        let queued = paths.len();
        if queued > 0 {
            let service = self.clone();
            tokio::spawn(async move {
                service.run(paths).await;
            });
        }
        Reply::Ok(StartAck { queued })
    }

    pub fn pause(&self) -> Reply<ControlAck> {
        self.control(ThumbnailPipeline::pause)
    }

    pub fn resume(&self) -> Reply<ControlAck> {
        self.control(ThumbnailPipeline::resume)
    }

    pub fn cancel(&self) -> Reply<ControlAck> {
        self.control(ThumbnailPipeline::cancel)
    }

    fn control(&self, op: fn(&ThumbnailPipeline) -> bool) -> Reply<ControlAck> {
        let changed = op(&self.inner.pipeline);
        Reply::Ok(ControlAck {
            changed,
            progress: self.inner.pipeline.progress(),
        })
    }

    pub fn progress(&self) -> Reply<GenerationProgress> {
        Reply::Ok(self.inner.pipeline.progress())
    }

    /// Enforce the stored policy on the cache directory
    ///
    /// Prunes never overlap. Unless forced, a prune within the minimum
    /// interval of the last successful one is skipped.
    pub async fn prune(&self, options: PruneOptions) -> Reply<PruneOutcome> {
        let mut last_prune = self.inner.last_prune.lock().await;

        if !options.force
            && let Some(last) = *last_prune
            && last.elapsed() < self.inner.options.min_prune_interval
        {
            log::debug!("Skipping prune, last one finished {:?} ago", last.elapsed());
            return Reply::Ok(PruneOutcome::throttled());
        }

        let policy = self.inner.policy_store.load();
        let bus = &self.inner.bus;
        let outcome = prune_cache(&self.inner.paths.cache_dir, &policy, options, |progress| {
            bus.emit(Event::CachePruneProgress(progress));
        })
        .await;

        if outcome.ok {
            *last_prune = Some(Instant::now());
            Reply::Ok(outcome)
        } else {
            Reply::Err(outcome.error.unwrap_or_else(|| "prune failed".to_string()))
        }
    }

    pub async fn get_info(&self) -> Reply<CacheInfo> {
        let policy = self.inner.policy_store.load();
        get_cache_info(&self.inner.paths.cache_dir, policy)
            .await
            .into()
    }

    pub fn get_policy(&self) -> Reply<CachePolicy> {
        Reply::Ok(self.inner.policy_store.load())
    }

    pub fn set_policy(&self, policy: CachePolicy) -> Reply<CachePolicy> {
        self.inner
            .policy_store
            .try_save(&policy)
            .map(|()| policy)
            .into()
    }

    /// Delete every cached artifact
    pub async fn clear(&self) -> Reply<ClearOutcome> {
        let _guard = self.inner.last_prune.lock().await;
        clear_cache(&self.inner.paths.cache_dir).await.into()
    }

    pub fn get_config(&self) -> Reply<ThumbnailConfig> {
        Reply::Ok(self.inner.config_store.load())
    }

    /// Persist generation settings; the next run picks them up
    pub fn set_config(&self, config: ThumbnailConfig) -> Reply<ThumbnailConfig> {
        let result = validate_config(&config).and_then(|()| {
            self.inner.config_store.try_save(&config)?;
            self.inner.pipeline.set_concurrency(config.concurrency);
            Ok(config)
        });
        result.into()
    }

    /// Route one request to its operation
    pub async fn dispatch(&self, request: Request) -> Reply<serde_json::Value> {
        log::debug!("Dispatching {request:?}");
        match request {
            Request::Start { paths } => self.start(paths).into_json(),
            Request::Pause => self.pause().into_json(),
            Request::Resume => self.resume().into_json(),
            Request::Cancel => self.cancel().into_json(),
            Request::Progress => self.progress().into_json(),
            Request::Prune { force } => self.prune(PruneOptions { force }).await.into_json(),
            Request::GetInfo => self.get_info().await.into_json(),
            Request::GetPolicy => self.get_policy().into_json(),
            Request::SetPolicy { policy } => self.set_policy(policy).into_json(),
            Request::Clear => self.clear().await.into_json(),
            Request::GetConfig => self.get_config().into_json(),
            Request::SetConfig { config } => self.set_config(config).into_json(),
        }
    }

    /// Parse and route a JSON request
    pub async fn dispatch_json(&self, raw: &str) -> Reply<serde_json::Value> {
        match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                let error = Error::Validation(ValidationError::unsupported_request(&e.to_string()));
                Reply::Err(error.to_string())
            }
        }
    }

    /// Prune on a timer until the returned handle is shut down
    ///
    /// The first prune runs immediately. Timer prunes are never forced, so
    /// they respect the minimum interval.
    pub fn spawn_auto_prune(&self, interval: Duration) -> AutoPruneHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let service = self.clone();

        let task = tokio::spawn(async move {
            log::info!("Auto-prune every {}s", interval.as_secs());
            loop {
                match service.prune(PruneOptions::default()).await {
                    Reply::Ok(outcome) if !outcome.skipped => log::debug!(
                        "Auto-prune removed {} files",
                        outcome.removed_files
                    ),
                    Reply::Ok(_) => {}
                    Reply::Err(e) => log::warn!("Auto-prune failed: {e}"),
                }

                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            log::info!("Auto-prune stopped");
        });

        AutoPruneHandle { shutdown, task }
    }
}

fn validate_config(config: &ThumbnailConfig) -> Result<()> {
    if config.concurrency == 0 {
        return Err(Error::Validation(ValidationError::invalid_parameter(
            "concurrency",
            "must be at least 1",
        )));
    }
    Ok(())
}

/// Handle to a running auto-prune timer
#[derive(Debug)]
pub struct AutoPruneHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutoPruneHandle {
    /// Stop the timer and wait for an in-progress prune to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Auto-prune task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
