//! Path resolution for the thumbcache CLI
//!
//! The data layout itself lives in [`thumbcache_core::AppPaths`]; this module
//! only decides where the CLI's own TOML configuration file sits.

use std::path::PathBuf;
use thumbcache_core::paths::APP_DATA_DIR;

/// The name of the CLI configuration file
pub const CONFIG_FILE: &str = "config.toml";

/// Returns the configuration directory
///
/// `$XDG_CONFIG_HOME/thumbcache` when set on Unix-like systems, otherwise the
/// platform config directory (`~/.config/thumbcache`, `%APPDATA%/thumbcache`).
/// Falls back to `.thumbcache` in the current directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DATA_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".thumbcache"))
}

/// Returns the path to `config.toml`
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
