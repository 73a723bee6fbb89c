//! Persistence tests for the cache policy and generation settings

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use thumbcache_core::policy::{DEFAULT_MAX_SIZE_BYTES, DEFAULT_TTL_SECONDS, POLICY_FILE_NAME};
use thumbcache_core::{
    AppPaths, CachePolicy, PolicyStore, ThumbnailConfig, load_policy, load_thumbnail_config,
    save_policy, save_thumbnail_config,
};

proptest! {
    #[test]
    fn test_policy_round_trip(max_size_bytes: u64, ttl_seconds: u64) {
        let temp_dir = TempDir::new().unwrap();
        let policy = CachePolicy { max_size_bytes, ttl_seconds };

        prop_assert!(save_policy(temp_dir.path(), &policy));
        prop_assert_eq!(load_policy(temp_dir.path()), policy);
    }

    #[test]
    fn test_garbage_never_panics(contents in ".{0,64}") {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(POLICY_FILE_NAME), contents).unwrap();

        // Either a valid document or the defaults, never an error
        let _ = load_policy(temp_dir.path());
    }
}

#[test]
fn test_defaults_are_documented_values() {
    let temp_dir = TempDir::new().unwrap();
    let policy = load_policy(temp_dir.path());

    assert_eq!(policy.max_size_bytes, DEFAULT_MAX_SIZE_BYTES);
    assert_eq!(policy.max_size_bytes, 500 * 1024 * 1024);
    assert_eq!(policy.ttl_seconds, DEFAULT_TTL_SECONDS);
    assert_eq!(policy.ttl_seconds, 30 * 24 * 3600);
    assert_eq!(load_thumbnail_config(temp_dir.path()).concurrency, 3);
}

#[test]
fn test_store_uses_app_paths_layout() {
    let temp_dir = TempDir::new().unwrap();
    let paths = AppPaths::new(temp_dir.path().join("data"));
    let store = PolicyStore::at_path(paths.policy_path());

    let policy = CachePolicy::default().with_ttl_seconds(0);
    store.try_save(&policy).unwrap();

    assert!(paths.policy_path().is_file());
    assert_eq!(load_policy(&paths.data_root), policy);
}

#[test]
fn test_settings_files_are_independent() {
    let temp_dir = TempDir::new().unwrap();

    assert!(save_thumbnail_config(
        temp_dir.path(),
        &ThumbnailConfig { concurrency: 8 }
    ));
    assert_eq!(load_policy(temp_dir.path()), CachePolicy::default());
    assert_eq!(load_thumbnail_config(temp_dir.path()).concurrency, 8);
}
