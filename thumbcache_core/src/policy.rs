//! Persisted cache policy and generation settings
//!
//! Both settings live as small JSON files in the application data root:
//! `cache-policy.json` and `thumbnail-config.json`. Loading never fails:
//! a missing, unreadable or corrupt file yields the defaults, and fields
//! absent from a partial file are filled from the defaults. Saving writes
//! a temporary sibling and renames it into place.

use crate::error::{Error, IoError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// File name of the persisted cache policy
pub const POLICY_FILE_NAME: &str = "cache-policy.json";

/// File name of the persisted generation settings
pub const THUMBNAIL_CONFIG_FILE_NAME: &str = "thumbnail-config.json";

/// Default size cap: 500 MiB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Default TTL: 30 days
pub const DEFAULT_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Default number of thumbnails generated at once
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Eviction policy for the thumbnail cache
///
/// A value of zero disables the corresponding rule: `max_size_bytes == 0`
/// means no size cap and `ttl_seconds == 0` means entries never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachePolicy {
    pub max_size_bytes: u64,
    pub ttl_seconds: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl CachePolicy {
    /// Policy that never evicts anything
    pub fn unlimited() -> Self {
        Self {
            max_size_bytes: 0,
            ttl_seconds: 0,
        }
    }

    /// Set the size cap in bytes (0 disables)
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the TTL in seconds (0 disables)
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Maximum entry age, or `None` when TTL eviction is disabled
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    /// Size cap, or `None` when the cache is unbounded
    pub fn size_limit(&self) -> Option<u64> {
        (self.max_size_bytes > 0).then_some(self.max_size_bytes)
    }

    /// Whether an entry last modified at `modified` is past its TTL at `now`
    ///
    /// Entries with a modification time in the future are never expired.
    pub fn is_expired(&self, modified: SystemTime, now: SystemTime) -> bool {
        match self.ttl() {
            Some(ttl) => now
                .duration_since(modified)
                .map(|age| age > ttl)
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Settings for the generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailConfig {
    pub concurrency: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A settings value persisted as a JSON file in the data root
pub trait StoredSetting: Serialize + DeserializeOwned + Default + Clone {
    /// File name inside the data root
    const FILE_NAME: &'static str;

    /// Clamp out-of-range values after loading and before saving
    fn normalized(self) -> Self {
        self
    }
}

impl StoredSetting for CachePolicy {
    const FILE_NAME: &'static str = POLICY_FILE_NAME;
}

impl StoredSetting for ThumbnailConfig {
    const FILE_NAME: &'static str = THUMBNAIL_CONFIG_FILE_NAME;

    fn normalized(self) -> Self {
        Self {
            concurrency: self.concurrency.max(1),
        }
    }
}

/// JSON file store for one settings value
#[derive(Debug, Clone)]
pub struct SettingsStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

/// Store for `cache-policy.json`
pub type PolicyStore = SettingsStore<CachePolicy>;

/// Store for `thumbnail-config.json`
pub type ThumbnailConfigStore = SettingsStore<ThumbnailConfig>;

impl<T: StoredSetting> SettingsStore<T> {
    /// Store for the setting's file inside `root`
    pub fn in_root(root: &Path) -> Self {
        Self::at_path(root.join(T::FILE_NAME))
    }

    /// Store backed by an explicit file path
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the setting, falling back to defaults on any problem
    pub fn load(&self) -> T {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} not found, using defaults", self.path.display());
                return T::default();
            }
            Err(e) => {
                log::warn!(
                    "Failed to read {}: {e}; using defaults",
                    self.path.display()
                );
                return T::default();
            }
        };

        match serde_json::from_str::<T>(&data) {
            Ok(value) => value.normalized(),
            Err(e) => {
                log::warn!(
                    "Ignoring corrupt settings file {}: {e}",
                    self.path.display()
                );
                T::default()
            }
        }
    }

    /// Persist the setting, reporting failures to the caller
    pub fn try_save(&self, value: &T) -> Result<()> {
        let data = serde_json::to_string_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_at(e, parent))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|e| io_at(e, &tmp_path))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| io_at(e, &self.path))?;

        Ok(())
    }

    /// Persist the setting; failures are logged and reported as `false`
    pub fn save(&self, value: &T) -> bool {
        match self.try_save(&value.clone().normalized()) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save {}: {e}", self.path.display());
                false
            }
        }
    }
}

fn io_at(source: std::io::Error, path: &Path) -> Error {
    Error::Io(IoError::from_std(source).with_path(path))
}

/// Load the cache policy stored in `root`
pub fn load_policy(root: &Path) -> CachePolicy {
    PolicyStore::in_root(root).load()
}

/// Save the cache policy into `root`
pub fn save_policy(root: &Path, policy: &CachePolicy) -> bool {
    PolicyStore::in_root(root).save(policy)
}

/// Load the generation settings stored in `root`
pub fn load_thumbnail_config(root: &Path) -> ThumbnailConfig {
    ThumbnailConfigStore::in_root(root).load()
}

/// Save the generation settings into `root`
pub fn save_thumbnail_config(root: &Path, config: &ThumbnailConfig) -> bool {
    ThumbnailConfigStore::in_root(root).save(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_zero_values_disable_rules() {
        let policy = CachePolicy::unlimited();
        assert_eq!(policy.ttl(), None);
        assert_eq!(policy.size_limit(), None);

        let long_ago = SystemTime::UNIX_EPOCH;
        assert!(!policy.is_expired(long_ago, SystemTime::now()));
    }

    #[test]
    fn test_is_expired_is_strict() {
        let policy = CachePolicy::unlimited().with_ttl_seconds(60);
        let now = SystemTime::now();

        assert!(!policy.is_expired(now - Duration::from_secs(60), now));
        assert!(policy.is_expired(now - Duration::from_secs(61), now));
        assert!(!policy.is_expired(now + Duration::from_secs(3600), now));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(load_policy(temp_dir.path()), CachePolicy::default());
        assert_eq!(
            load_thumbnail_config(temp_dir.path()),
            ThumbnailConfig::default()
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(POLICY_FILE_NAME),
            r#"{"maxSizeBytes": 1024}"#,
        )
        .unwrap();

        let policy = load_policy(temp_dir.path());
        assert_eq!(policy.max_size_bytes, 1024);
        assert_eq!(policy.ttl_seconds, DEFAULT_TTL_SECONDS);
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(POLICY_FILE_NAME), "{ not json").unwrap();
        assert_eq!(load_policy(temp_dir.path()), CachePolicy::default());

        fs::write(
            temp_dir.path().join(POLICY_FILE_NAME),
            r#"{"maxSizeBytes": -5}"#,
        )
        .unwrap();
        assert_eq!(load_policy(temp_dir.path()), CachePolicy::default());
    }

    #[test]
    fn test_save_writes_camel_case_json() {
        let temp_dir = TempDir::new().unwrap();
        let policy = CachePolicy::unlimited()
            .with_max_size_bytes(350)
            .with_ttl_seconds(7);

        assert!(save_policy(temp_dir.path(), &policy));

        let raw = fs::read_to_string(temp_dir.path().join(POLICY_FILE_NAME)).unwrap();
        assert!(raw.contains("\"maxSizeBytes\": 350"));
        assert!(raw.contains("\"ttlSeconds\": 7"));
        assert!(!temp_dir.path().join("cache-policy.json.tmp").exists());
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(THUMBNAIL_CONFIG_FILE_NAME),
            r#"{"concurrency": 0}"#,
        )
        .unwrap();
        assert_eq!(load_thumbnail_config(temp_dir.path()).concurrency, 1);

        assert!(save_thumbnail_config(
            temp_dir.path(),
            &ThumbnailConfig { concurrency: 0 }
        ));
        let raw = fs::read_to_string(temp_dir.path().join(THUMBNAIL_CONFIG_FILE_NAME)).unwrap();
        assert!(raw.contains("\"concurrency\": 1"));
    }

    #[test]
    fn test_save_into_unwritable_location_returns_false() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        // The parent of the settings file is a regular file
        assert!(!save_policy(&blocker, &CachePolicy::default()));
    }
}
