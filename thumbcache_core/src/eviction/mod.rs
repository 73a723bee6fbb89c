//! Cache eviction engine
//!
//! [`prune_cache`] enforces a [`CachePolicy`] against the cache directory in
//! strictly sequential phases:
//!
//! 1. scan: inventory every regular file (size and mtime only)
//! 2. ttl: delete entries older than the TTL
//! 3. re-scan: recompute the remaining set from disk
//! 4. size: delete oldest-mtime-first until the total is within the cap
//! 5. done
//!
//! Only a failed scan is fatal. Deletion failures are reported in progress
//! messages and the phase continues. Directories are never deleted.
//!
//! Nothing here coordinates with a generation run writing into the same
//! directory: an artifact written during a prune may be removed right after
//! creation. Such a file is simply regenerated on its next request.

pub mod scan;

pub use scan::{
    CacheEntry, CacheFileInfo, CacheInfo, CacheInventory, SCAN_BATCH_SIZE, get_cache_info,
    scan_cache,
};

use crate::error::Result;
use crate::policy::CachePolicy;
use crate::progress::{PrunePhase, PruneProgress};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

/// Caller options for one prune
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneOptions {
    /// Requested explicitly by the user rather than by a timer
    #[serde(default)]
    pub force: bool,
}

impl PruneOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Result of one prune
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_remaining_bytes: Option<u64>,
    #[serde(default)]
    pub removed_files: usize,
    #[serde(default)]
    pub removed_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The prune did not run because an earlier one finished too recently
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl PruneOutcome {
    fn failed(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// A prune that was throttled without touching the disk
    pub fn throttled() -> Self {
        Self {
            ok: true,
            skipped: true,
            ..Self::default()
        }
    }
}

/// Totals of a full wipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub removed_files: usize,
    pub removed_bytes: u64,
    pub failed_files: usize,
}

/// Running totals across the deletion phases
#[derive(Debug, Default)]
struct Removal {
    files: usize,
    bytes: u64,
}

enum Deletion {
    Removed,
    Gone,
    Failed(std::io::Error),
}

async fn delete(path: &Path) -> Deletion {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Deletion::Removed,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Deletion::Gone,
        Err(e) => Deletion::Failed(e),
    }
}

/// Enforce `policy` on the cache under `cache_root`
///
/// `on_progress` is called before every phase advances, once per deletion
/// attempt and once per phase summary. The call always resolves; a fatal
/// scan error comes back as `ok == false` after a `phase: error` event.
pub async fn prune_cache<P>(
    cache_root: &Path,
    policy: &CachePolicy,
    options: PruneOptions,
    mut on_progress: P,
) -> PruneOutcome
where
    P: FnMut(PruneProgress),
{
    let started = if options.force {
        "Forced prune started"
    } else {
        "Prune started"
    };
    on_progress(
        PruneProgress::new(PrunePhase::Scan)
            .with_scanned(0)
            .with_message(started),
    );

    match run_phases(cache_root, policy, &mut on_progress).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Cache prune of {} failed: {e}", cache_root.display());
            on_progress(PruneProgress::new(PrunePhase::Error).with_message(e.to_string()));
            PruneOutcome::failed(e)
        }
    }
}

async fn run_phases<P>(
    cache_root: &Path,
    policy: &CachePolicy,
    on_progress: &mut P,
) -> Result<PruneOutcome>
where
    P: FnMut(PruneProgress),
{
    // Phase 1: scan
    let inventory = scan_cache(cache_root, |count| {
        on_progress(PruneProgress::new(PrunePhase::Scan).with_scanned(count));
    })
    .await?;
    on_progress(
        PruneProgress::new(PrunePhase::Scan)
            .with_scanned(inventory.file_count())
            .with_totals(inventory.file_count(), inventory.total_bytes),
    );

    let mut removal = Removal::default();

    // Phase 2: TTL
    let now = SystemTime::now();
    let mut ttl_removed = 0usize;
    for entry in inventory
        .entries
        .iter()
        .filter(|entry| policy.is_expired(entry.modified, now))
    {
        let mut event = PruneProgress::new(PrunePhase::Ttl).with_current_file(&entry.path);
        match delete(&entry.path).await {
            Deletion::Removed => {
                removal.files += 1;
                removal.bytes += entry.size_bytes;
                ttl_removed += 1;
            }
            Deletion::Gone => log::debug!("{} already gone", entry.path.display()),
            Deletion::Failed(e) => {
                log::warn!("Failed to delete expired {}: {e}", entry.path.display());
                event = event.with_message(format!("Failed to delete: {e}"));
            }
        }
        on_progress(event.with_removed(removal.files, removal.bytes));
    }
    on_progress(
        PruneProgress::new(PrunePhase::Ttl)
            .with_removed(removal.files, removal.bytes)
            .with_message(format!("Removed {ttl_removed} expired files")),
    );

    // Phase 3: re-scan what actually remains
    let remaining = scan_cache(cache_root, |_| {}).await?;
    let mut total = remaining.total_bytes;
    on_progress(
        PruneProgress::new(PrunePhase::Size).with_totals(remaining.file_count(), total),
    );

    // Phase 4: size cap, oldest first; the stable sort keeps traversal
    // order among equal mtimes
    if let Some(limit) = policy.size_limit()
        && total > limit
    {
        let mut entries = remaining.entries;
        entries.sort_by_key(|entry| entry.modified);

        let mut size_removed = 0usize;
        for entry in &entries {
            if total <= limit {
                break;
            }

            let mut event = PruneProgress::new(PrunePhase::Size).with_current_file(&entry.path);
            match delete(&entry.path).await {
                Deletion::Removed => {
                    removal.files += 1;
                    removal.bytes += entry.size_bytes;
                    size_removed += 1;
                    total = total.saturating_sub(entry.size_bytes);
                }
                Deletion::Gone => {
                    // Someone else freed the space
                    total = total.saturating_sub(entry.size_bytes);
                }
                Deletion::Failed(e) => {
                    log::warn!("Failed to evict {}: {e}", entry.path.display());
                    event = event.with_message(format!("Failed to delete: {e}"));
                }
            }
            on_progress(
                event
                    .with_removed(removal.files, removal.bytes)
                    .with_remaining(total),
            );
        }

        on_progress(
            PruneProgress::new(PrunePhase::Size)
                .with_removed(removal.files, removal.bytes)
                .with_remaining(total)
                .with_message(format!("Removed {size_removed} files over the size cap")),
        );
    }

    // Phase 5: done
    on_progress(
        PruneProgress::new(PrunePhase::Done)
            .with_removed(removal.files, removal.bytes)
            .with_remaining(total),
    );
    log::info!(
        "Pruned {}: removed {} files ({} bytes), {} bytes remain",
        cache_root.display(),
        removal.files,
        removal.bytes,
        total
    );

    Ok(PruneOutcome {
        ok: true,
        total_remaining_bytes: Some(total),
        removed_files: removal.files,
        removed_bytes: removal.bytes,
        error: None,
        skipped: false,
    })
}

/// Delete every regular file under `cache_root`, keeping directories
///
/// A missing root clears nothing. Per-file failures are counted.
pub async fn clear_cache(cache_root: &Path) -> Result<ClearOutcome> {
    let inventory = scan_cache(cache_root, |_| {}).await?;
    let mut outcome = ClearOutcome::default();

    for entry in &inventory.entries {
        match delete(&entry.path).await {
            Deletion::Removed => {
                outcome.removed_files += 1;
                outcome.removed_bytes += entry.size_bytes;
            }
            Deletion::Gone => {}
            Deletion::Failed(e) => {
                log::warn!("Failed to delete {}: {e}", entry.path.display());
                outcome.failed_files += 1;
            }
        }
    }

    log::info!(
        "Cleared {}: {} files, {} bytes",
        cache_root.display(),
        outcome.removed_files,
        outcome.removed_bytes
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_root_prunes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut phases = Vec::new();

        let outcome = prune_cache(
            &temp_dir.path().join("missing"),
            &CachePolicy::default(),
            PruneOptions::default(),
            |p| phases.push(p.phase),
        )
        .await;

        assert!(outcome.ok);
        assert_eq!(outcome.total_remaining_bytes, Some(0));
        assert_eq!(phases.first(), Some(&PrunePhase::Scan));
        assert_eq!(phases.last(), Some(&PrunePhase::Done));
    }

    #[tokio::test]
    async fn test_scan_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file-root");
        std::fs::write(&file, b"x").unwrap();

        let mut last = None;
        let outcome = prune_cache(&file, &CachePolicy::default(), PruneOptions::forced(), |p| {
            last = Some(p)
        })
        .await;

        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("Not a directory"));
        let last = last.unwrap();
        assert_eq!(last.phase, PrunePhase::Error);
        assert!(last.message.is_some());
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_forced_prune_is_announced() {
        let temp_dir = TempDir::new().unwrap();
        let mut first = None;

        prune_cache(temp_dir.path(), &CachePolicy::unlimited(), PruneOptions::forced(), |p| {
            first.get_or_insert(p);
        })
        .await;

        assert_eq!(first.unwrap().message.as_deref(), Some("Forced prune started"));
    }

    #[tokio::test]
    async fn test_clear_keeps_directories() {
        let temp_dir = TempDir::new().unwrap();
        let shard = temp_dir.path().join("ab");
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join("x.thumb"), vec![0u8; 8]).unwrap();
        std::fs::write(temp_dir.path().join("y.thumb"), vec![0u8; 2]).unwrap();

        let outcome = clear_cache(temp_dir.path()).await.unwrap();

        assert_eq!(outcome.removed_files, 2);
        assert_eq!(outcome.removed_bytes, 10);
        assert_eq!(outcome.failed_files, 0);
        assert!(shard.is_dir());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(PruneOutcome::throttled()).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["skipped"], true);
        assert!(json.get("error").is_none());

        let json = serde_json::to_value(PruneOutcome::failed("boom")).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("skipped").is_none());
    }
}
