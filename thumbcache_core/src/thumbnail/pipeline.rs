//! Stateful thumbnail generation controller
//!
//! One pipeline owns one [`GenerationProgress`] and drives batches of source
//! paths through the bounded runner. Runs move through
//! `idle -> running <-> paused -> completed | error`, and `cancel` returns any
//! non-idle run to `idle`.
//!
//! Pause and cancel are cooperative. Every task passes a checkpoint before it
//! starts work: a paused run blocks there on a watch channel until resumed,
//! and a cancelled run is detected through its epoch. Work already past the
//! checkpoint finishes its single generation step, but a task whose epoch is
//! stale never touches the counters and never emits.

use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::policy::{DEFAULT_CONCURRENCY, ThumbnailConfig};
use crate::progress::{GenerationProgress, GenerationStatus, ThumbnailError};
use crate::runner::run_with_concurrency;
use crate::thumbnail::generator::{SidecarGenerator, ThumbnailGenerator};
use crate::thumbnail::store::ThumbnailStore;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;

/// Construction options for [`ThumbnailPipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum number of files processed at once
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<ThumbnailConfig> for PipelineOptions {
    fn from(config: ThumbnailConfig) -> Self {
        Self {
            concurrency: config.concurrency,
        }
    }
}

/// What the tasks of the current run observe at their checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Control {
    epoch: u64,
    paused: bool,
}

struct RunState {
    progress: GenerationProgress,
    epoch: u64,
    seq: u64,
    started_at: Option<Instant>,
}

impl RunState {
    /// Number the current progress for ordered emission
    fn stamp(&mut self) -> (u64, GenerationProgress) {
        self.seq += 1;
        (self.seq, self.progress.clone())
    }

    fn refresh_eta(&mut self) {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or_default();
        self.progress.estimated_seconds_remaining =
            estimate_remaining(self.progress.completed, self.progress.remaining(), elapsed);
    }
}

/// Seconds left at the observed completion rate, `None` while the rate is zero
fn estimate_remaining(completed: usize, remaining: usize, elapsed_secs: f64) -> Option<u64> {
    if completed == 0 || elapsed_secs <= 0.0 {
        return None;
    }
    let rate = completed as f64 / elapsed_secs;
    Some((remaining as f64 / rate).ceil() as u64)
}

enum Outcome {
    Skipped,
    Generated,
    Failed(Error),
}

thread_local! {
    static EMITTING: Cell<bool> = const { Cell::new(false) };
}

/// Publishes snapshots in stamp order
///
/// A snapshot older than one already published is dropped, so subscribers
/// never see a stale `running` snapshot after the `idle` one of a cancel.
struct Emitter {
    bus: EventBus,
    gate: Mutex<()>,
    last_seq: AtomicU64,
}

impl Emitter {
    fn publish(&self, seq: u64, event: Event) {
        // A subscriber callback emitting through the pipeline already holds
        // the gate on this thread
        if EMITTING.with(Cell::get) {
            if self.last_seq.fetch_max(seq, Ordering::SeqCst) <= seq {
                self.bus.emit(event);
            }
            return;
        }

        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.last_seq.fetch_max(seq, Ordering::SeqCst) > seq {
            log::trace!("Dropping superseded progress snapshot #{seq}");
            return;
        }

        let _flag = EmittingFlag::set();
        self.bus.emit(event);
    }
}

struct EmittingFlag;

impl EmittingFlag {
    fn set() -> Self {
        EMITTING.with(|f| f.set(true));
        Self
    }
}

impl Drop for EmittingFlag {
    fn drop(&mut self) {
        EMITTING.with(|f| f.set(false));
    }
}

struct Inner {
    store: ThumbnailStore,
    generator: Arc<dyn ThumbnailGenerator>,
    concurrency: AtomicUsize,
    state: Mutex<RunState>,
    control: watch::Sender<Control>,
    emitter: Emitter,
}

/// Pausable, cancellable thumbnail generation over a batch of files
///
/// Cheap to clone; clones share the same run state.
#[derive(Clone)]
pub struct ThumbnailPipeline {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ThumbnailPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailPipeline")
            .field("cache_dir", &self.inner.store.root())
            .field("generator", &self.inner.generator.name())
            .field("concurrency", &self.concurrency())
            .finish()
    }
}

impl ThumbnailPipeline {
    pub fn new(
        store: ThumbnailStore,
        generator: Arc<dyn ThumbnailGenerator>,
        bus: EventBus,
        options: PipelineOptions,
    ) -> Self {
        let (control, _) = watch::channel(Control {
            epoch: 0,
            paused: false,
        });

        Self {
            inner: Arc::new(Inner {
                store,
                generator,
                concurrency: AtomicUsize::new(options.concurrency.max(1)),
                state: Mutex::new(RunState {
                    progress: GenerationProgress::default(),
                    epoch: 0,
                    seq: 0,
                    started_at: None,
                }),
                control,
                emitter: Emitter {
                    bus,
                    gate: Mutex::new(()),
                    last_seq: AtomicU64::new(0),
                },
            }),
        }
    }

    /// Pipeline writing side-car artifacts into `cache_dir`
    pub fn with_sidecar(cache_dir: impl Into<PathBuf>, bus: EventBus) -> Self {
        Self::new(
            ThumbnailStore::new(cache_dir),
            Arc::new(SidecarGenerator),
            bus,
            PipelineOptions::default(),
        )
    }

    pub fn store(&self) -> &ThumbnailStore {
        &self.inner.store
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency.load(Ordering::Relaxed)
    }

    /// Change the concurrency used by the next run
    pub fn set_concurrency(&self, concurrency: usize) {
        self.inner
            .concurrency
            .store(concurrency.max(1), Ordering::Relaxed);
    }

    /// Current progress snapshot
    pub fn progress(&self) -> GenerationProgress {
        self.inner.lock().progress.clone()
    }

    /// Generate or reuse thumbnails for every path
    ///
    /// Resolves once the run settles, with the final snapshot. Per-file
    /// failures are counted, not returned; a failure that does not concern a
    /// single file ends the run with `status == error`. An active run is
    /// cancelled before the new one starts. An empty batch is a no-op.
    pub async fn generate(&self, paths: Vec<PathBuf>) -> GenerationProgress {
        if paths.is_empty() {
            return self.progress();
        }

        self.cancel();

        let inner = &*self.inner;
        let total = paths.len();
        let epoch = {
            let mut state = inner.lock();
            state.epoch += 1;
            let epoch = state.epoch;
            state.progress = GenerationProgress::started(total);
            state.started_at = Some(Instant::now());
            inner.control.send_replace(Control {
                epoch,
                paused: false,
            });
            let (seq, snapshot) = state.stamp();
            drop(state);
            inner.publish_progress(seq, snapshot);
            epoch
        };

        let concurrency = self.concurrency();
        log::info!(
            "Generating thumbnails for {total} files with {} generator (concurrency {concurrency})",
            inner.generator.name()
        );

        let result =
            run_with_concurrency(paths, concurrency, |path, _| inner.process(epoch, path)).await;

        inner.finish(epoch, result)
    }

    /// Suspend the current run at its next checkpoint
    ///
    /// Returns `false` unless a run was running.
    pub fn pause(&self) -> bool {
        self.inner.transition(GenerationStatus::Running, GenerationStatus::Paused)
    }

    /// Continue a paused run
    ///
    /// Returns `false` unless a run was paused.
    pub fn resume(&self) -> bool {
        self.inner.transition(GenerationStatus::Paused, GenerationStatus::Running)
    }

    /// Stop the current run and return to idle
    ///
    /// Returns `false` when already idle.
    pub fn cancel(&self) -> bool {
        let inner = &*self.inner;
        let mut state = inner.lock();
        if state.progress.status == GenerationStatus::Idle {
            return false;
        }

        state.epoch += 1;
        inner.control.send_replace(Control {
            epoch: state.epoch,
            paused: false,
        });
        state.progress.status = GenerationStatus::Idle;
        state.progress.current_file = None;
        state.progress.estimated_seconds_remaining = None;
        let (seq, snapshot) = state.stamp();
        drop(state);

        log::info!(
            "Cancelled thumbnail run after {}/{} files",
            snapshot.completed,
            snapshot.total
        );
        inner.publish_progress(seq, snapshot);
        true
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_progress(&self, seq: u64, snapshot: GenerationProgress) {
        self.emitter.publish(seq, Event::ThumbnailProgress(snapshot));
    }

    fn transition(&self, from: GenerationStatus, to: GenerationStatus) -> bool {
        let mut state = self.lock();
        if state.progress.status != from {
            return false;
        }

        state.progress.status = to;
        self.control
            .send_modify(|control| control.paused = to == GenerationStatus::Paused);
        let (seq, snapshot) = state.stamp();
        drop(state);

        log::debug!("Thumbnail run {from:?} -> {to:?}");
        self.publish_progress(seq, snapshot);
        true
    }

    /// Apply `update` if `epoch` is still the current run
    fn update<F>(&self, epoch: u64, update: F) -> Option<(u64, GenerationProgress)>
    where
        F: FnOnce(&mut RunState),
    {
        let mut state = self.lock();
        if state.epoch != epoch {
            return None;
        }
        update(&mut state);
        Some(state.stamp())
    }

    /// Wait out a pause; `false` once the run is no longer current
    async fn checkpoint(&self, epoch: u64) -> bool {
        let mut control = self.control.subscribe();
        control
            .wait_for(|c| c.epoch != epoch || !c.paused)
            .await
            .map(|c| c.epoch == epoch)
            .unwrap_or(false)
    }

    async fn process(&self, epoch: u64, path: PathBuf) -> Result<()> {
        if !self.checkpoint(epoch).await {
            return Ok(());
        }

        let display = path.display().to_string();
        match self.update(epoch, |state| state.progress.current_file = Some(display)) {
            Some((seq, snapshot)) => self.publish_progress(seq, snapshot),
            None => return Ok(()),
        }

        let outcome = if self.store.contains(&path).await {
            log::debug!("Cache hit for {}", path.display());
            Outcome::Skipped
        } else {
            match self.generate_one(&path).await {
                Ok(()) => Outcome::Generated,
                Err(e) if e.is_per_file() => Outcome::Failed(e),
                Err(e) => return Err(e),
            }
        };

        self.record(epoch, &path, outcome);
        Ok(())
    }

    async fn generate_one(&self, path: &Path) -> Result<()> {
        let bytes = self.generator.generate(path).await?;
        let artifact = self.store.write(path, &bytes).await?;
        log::debug!("Wrote {} for {}", artifact.display(), path.display());
        Ok(())
    }

    fn record(&self, epoch: u64, path: &Path, outcome: Outcome) {
        let failure = match &outcome {
            Outcome::Failed(e) => Some(ThumbnailError::new(path, e)),
            _ => None,
        };

        let Some((seq, snapshot)) = self.update(epoch, |state| {
            match outcome {
                Outcome::Skipped => state.progress.skipped += 1,
                Outcome::Failed(_) => state.progress.errors += 1,
                Outcome::Generated => {}
            }
            state.progress.completed += 1;
            state.refresh_eta();
        }) else {
            return;
        };

        if let Some(error) = failure {
            log::warn!("Thumbnail failed for {}: {}", error.file_path, error.error);
            self.emitter.publish(seq, Event::ThumbnailError(error));
        }
        self.publish_progress(seq, snapshot);
    }

    fn finish(&self, epoch: u64, result: Result<Vec<()>>) -> GenerationProgress {
        let mut state = self.lock();
        if state.epoch != epoch {
            // Cancelled or superseded; the newer state already went out
            return state.progress.clone();
        }

        match result {
            Ok(_) => {
                state.progress.status = GenerationStatus::Completed;
                state.refresh_eta();
                log::info!(
                    "Thumbnail run finished: {} processed, {} skipped, {} failed",
                    state.progress.completed,
                    state.progress.skipped,
                    state.progress.errors
                );
            }
            Err(e) => {
                state.progress.status = GenerationStatus::Error;
                state.progress.estimated_seconds_remaining = None;
                log::error!("Thumbnail run aborted: {e}");
            }
        }
        state.progress.current_file = None;

        let (seq, snapshot) = state.stamp();
        drop(state);
        self.publish_progress(seq, snapshot.clone());
        snapshot
    }
}
