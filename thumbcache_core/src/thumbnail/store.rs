//! On-disk layout of generated thumbnails
//!
//! Artifacts are keyed by the MD5 of the source path and fanned out into
//! 256 subdirectories: `<root>/<2 hex>/<32 hex>.thumb`. Writes go to a
//! unique temporary sibling first, so a lookup never observes a partial
//! artifact. The temporary file is removed if the write fails or the
//! future is dropped before the rename.

use crate::error::{Error, IoError, Result};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// File extension of finished artifacts
pub const ARTIFACT_EXTENSION: &str = "thumb";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content-addressed thumbnail directory
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    root: PathBuf,
}

impl ThumbnailStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercase hex MD5 of the source path
    pub fn cache_key(source: &Path) -> String {
        format!("{:x}", Md5::digest(source.to_string_lossy().as_bytes()))
    }

    /// Where the artifact for `source` lives, whether or not it exists
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        let key = Self::cache_key(source);
        self.root
            .join(&key[..2])
            .join(format!("{key}.{ARTIFACT_EXTENSION}"))
    }

    /// Cache-hit lookup
    pub async fn contains(&self, source: &Path) -> bool {
        tokio::fs::metadata(self.artifact_path(source))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Persist `bytes` as the artifact for `source`
    pub async fn write(&self, source: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.artifact_path(source);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_at(e, parent))?;
        }

        let tmp = target.with_extension(format!(
            "{ARTIFACT_EXTENSION}.{}-{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let guard = TempFileGuard::new(tmp);
        tokio::fs::write(guard.path(), bytes)
            .await
            .map_err(|e| io_at(e, guard.path()))?;

        tokio::fs::rename(guard.path(), &target)
            .await
            .map_err(|e| io_at(e, &target))?;
        guard.disarm();

        Ok(target)
    }

    /// Remove the artifact for `source`; returns whether one existed
    pub async fn remove(&self, source: &Path) -> Result<bool> {
        let target = self.artifact_path(source);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_at(e, &target)),
        }
    }
}

/// Deletes a temporary file on drop unless disarmed
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; leave it alone
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed abandoned {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {e}", self.path.display()),
        }
    }
}

fn io_at(source: std::io::Error, path: &Path) -> Error {
    Error::Io(IoError::from_std(source).with_path(path))
}
