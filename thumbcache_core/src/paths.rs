//! Data directory layout
//!
//! Every component receives an explicit `AppPaths` at construction time;
//! nothing in the library resolves directories on first access.

use crate::error::{Error, IoError, Result};
use crate::policy::{POLICY_FILE_NAME, THUMBNAIL_CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// The name of the application data directory used across all platforms
pub const APP_DATA_DIR: &str = "thumbcache";

/// The name of the thumbnail cache subdirectory
pub const CACHE_SUBDIR: &str = "thumbnails";

/// Resolved locations of the persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Root holding the JSON settings files
    pub data_root: PathBuf,
    /// Directory tree of generated thumbnail artifacts
    pub cache_dir: PathBuf,
}

impl AppPaths {
    /// Layout rooted at `data_root` with the cache in its `thumbnails/` child
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        let cache_dir = data_root.join(CACHE_SUBDIR);
        Self {
            data_root,
            cache_dir,
        }
    }

    /// Platform default: `~/.local/share/thumbcache` on Linux,
    /// `%APPDATA%/thumbcache` on Windows, `.thumbcache` as a last resort
    pub fn platform_default() -> Self {
        let data_root = dirs::data_dir()
            .map(|d| d.join(APP_DATA_DIR))
            .unwrap_or_else(|| PathBuf::from(".thumbcache"));
        Self::new(data_root)
    }

    /// Override the cache directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Path of `cache-policy.json`
    pub fn policy_path(&self) -> PathBuf {
        self.data_root.join(POLICY_FILE_NAME)
    }

    /// Path of `thumbnail-config.json`
    pub fn thumbnail_config_path(&self) -> PathBuf {
        self.data_root.join(THUMBNAIL_CONFIG_FILE_NAME)
    }

    /// Create the data root and cache directory if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_root, &self.cache_dir] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::Io(IoError::not_a_directory(dir)));
    }
    std::fs::create_dir_all(dir).map_err(|e| Error::Io(IoError::from_std(e).with_path(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_dir_is_under_data_root() {
        let paths = AppPaths::new("/data/thumbcache");
        assert!(paths.cache_dir.starts_with(&paths.data_root));
        assert_eq!(
            paths.cache_dir.file_name().and_then(|n| n.to_str()),
            Some(CACHE_SUBDIR)
        );
    }

    #[test]
    fn test_settings_files_live_in_data_root() {
        let paths = AppPaths::new("/data/thumbcache");
        assert_eq!(paths.policy_path().parent(), Some(paths.data_root.as_path()));
        assert!(paths.policy_path().ends_with(POLICY_FILE_NAME));
        assert!(
            paths
                .thumbnail_config_path()
                .ends_with(THUMBNAIL_CONFIG_FILE_NAME)
        );
    }

    #[test]
    fn test_platform_default_uses_app_dir() {
        let paths = AppPaths::platform_default();
        assert!(paths.data_root.to_string_lossy().contains("thumbcache"));
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::new(temp_dir.path().join("nested/root"));

        paths.ensure_dirs().unwrap();
        assert!(paths.cache_dir.is_dir());
    }

    #[test]
    fn test_ensure_dirs_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = AppPaths::new(&file).ensure_dirs().unwrap_err();
        assert!(err.to_string().contains("Not a directory"));
    }
}
