//! Metadata-only inventory of the cache directory
//!
//! Traversal runs on a blocking thread and never opens file contents.
//! Unreadable entries below the root are skipped; only a root that cannot
//! be enumerated at all is an error. A missing root is an empty cache.

use crate::error::{Error, IoError, Result};
use crate::policy::CachePolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Files scanned between two batch progress reports
pub const SCAN_BATCH_SIZE: usize = 100;

/// One regular file found under the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Result of one traversal, in traversal order
#[derive(Debug, Clone, Default)]
pub struct CacheInventory {
    pub entries: Vec<CacheEntry>,
    pub total_bytes: u64,
}

impl CacheInventory {
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }
}

/// Enumerate every regular file under `root`
///
/// `on_batch` receives the running file count every [`SCAN_BATCH_SIZE`]
/// files.
pub async fn scan_cache<F>(root: &Path, mut on_batch: F) -> Result<CacheInventory>
where
    F: FnMut(usize),
{
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(Error::Io(IoError::not_a_directory(root))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("Cache root {} does not exist yet", root.display());
            return Ok(CacheInventory::default());
        }
        Err(e) => return Err(Error::Io(IoError::from_std(e).with_path(root))),
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let walk_root = root.to_path_buf();
    let walker = tokio::task::spawn_blocking(move || walk(&walk_root, |count| {
        let _ = tx.send(count);
    }));

    while let Some(count) = rx.recv().await {
        on_batch(count);
    }

    walker.await?
}

fn walk<F: FnMut(usize)>(root: &Path, mut on_batch: F) -> Result<CacheInventory> {
    let mut inventory = CacheInventory::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(Error::Io(IoError::from_std(source).with_path(&path)));
            }
            Err(e) => {
                log::debug!("Skipping unreadable cache entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                log::debug!("Skipping {}: {e}", entry.path().display());
                continue;
            }
        };

        inventory.total_bytes += metadata.len();
        inventory.entries.push(CacheEntry {
            path: entry.into_path(),
            size_bytes: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });

        if inventory.entries.len() % SCAN_BATCH_SIZE == 0 {
            on_batch(inventory.entries.len());
        }
    }

    Ok(inventory)
}

/// One file as listed by [`get_cache_info`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFileInfo {
    pub path: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Read-only snapshot of cache usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub dir: String,
    pub total_size: u64,
    pub file_count: usize,
    pub files: Vec<CacheFileInfo>,
    pub policy: CachePolicy,
}

/// Describe the cache under `root` without modifying anything
///
/// Files are listed by path so repeated calls over an unchanged directory
/// return identical snapshots.
pub async fn get_cache_info(root: &Path, policy: CachePolicy) -> Result<CacheInfo> {
    let inventory = scan_cache(root, |_| {}).await?;

    let mut files: Vec<CacheFileInfo> = inventory
        .entries
        .iter()
        .map(|entry| CacheFileInfo {
            path: entry.path.display().to_string(),
            size_bytes: entry.size_bytes,
            modified: DateTime::<Utc>::from(entry.modified),
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(CacheInfo {
        dir: root.display().to_string(),
        total_size: inventory.total_bytes,
        file_count: files.len(),
        files,
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let inventory = scan_cache(&temp_dir.path().join("absent"), |_| {})
            .await
            .unwrap();
        assert_eq!(inventory.file_count(), 0);
        assert_eq!(inventory.total_bytes, 0);
    }

    #[tokio::test]
    async fn test_file_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-cache");
        std::fs::write(&file, b"x").unwrap();

        let err = scan_cache(&file, |_| {}).await.unwrap_err();
        assert!(err.to_string().contains("Not a directory"));
    }

    #[tokio::test]
    async fn test_nested_files_counted_and_dirs_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("ab");
        std::fs::create_dir_all(nested.join("empty")).unwrap();
        std::fs::write(nested.join("one.thumb"), vec![0u8; 10]).unwrap();
        std::fs::write(temp_dir.path().join("two.thumb"), vec![0u8; 5]).unwrap();

        let inventory = scan_cache(temp_dir.path(), |_| {}).await.unwrap();
        assert_eq!(inventory.file_count(), 2);
        assert_eq!(inventory.total_bytes, 15);
    }

    #[tokio::test]
    async fn test_batches_reported() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..250 {
            std::fs::write(temp_dir.path().join(format!("{i}.thumb")), b"z").unwrap();
        }

        let mut batches = Vec::new();
        let inventory = scan_cache(temp_dir.path(), |count| batches.push(count))
            .await
            .unwrap();

        assert_eq!(inventory.file_count(), 250);
        assert_eq!(batches, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_cache_info_lists_sorted_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.thumb"), vec![0u8; 3]).unwrap();
        std::fs::write(temp_dir.path().join("a.thumb"), vec![0u8; 4]).unwrap();

        let info = get_cache_info(temp_dir.path(), CachePolicy::default())
            .await
            .unwrap();

        assert_eq!(info.file_count, 2);
        assert_eq!(info.total_size, 7);
        assert!(info.files[0].path.ends_with("a.thumb"));
        assert_eq!(info.policy, CachePolicy::default());
    }
}
