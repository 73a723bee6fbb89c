use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thumbcache_core::{AppPaths, ServiceOptions};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "THUMBCACHE_";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub prune: PruneConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct StorageConfig {
    /// Replaces the platform data directory as the root of all state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PruneConfig {
    pub interval_seconds: u64,
    pub min_interval_seconds: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            min_interval_seconds: 60,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

impl AppConfig {
    /// Data layout honoring the `storage.data_dir` override
    pub fn app_paths(&self) -> AppPaths {
        match &self.storage.data_dir {
            Some(dir) => AppPaths::new(dir),
            None => AppPaths::platform_default(),
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            min_prune_interval: Duration::from_secs(self.prune.min_interval_seconds),
        }
    }

    /// Auto-prune period, never shorter than one second
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune.interval_seconds.max(1))
    }
}

/// Layered configuration backed by a TOML file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Manager for the platform config file
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Manager for an explicit file, used by tests
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = toml::Value::try_from(self.load()?)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{key}' not found"))?;
                }
                _ => anyhow::bail!("Invalid key path: {key}"),
            }
        }

        scalar_to_string(current)
            .ok_or_else(|| anyhow::anyhow!("Value at '{key}' is not a simple type"))
    }

    /// Set a configuration value by dotted key and write the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .with_context(|| format!("Failed to read {}", self.config_path.display()))?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((leaf, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for section in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{section}'");
            };
            current = table
                .entry(section.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(leaf.to_string(), parsed_value);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;

        Ok(())
    }

    /// Every effective value as sorted `(key, value)` pairs
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self.load()?)?;

        let mut items = Vec::new();
        collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
    if let toml::Value::Table(table) = value {
        for (key, val) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_values(val, path, items);
        }
    } else if let Some(s) = scalar_to_string(value) {
        items.push((prefix, s));
    }
}

/// Validate `value` for `key` and convert it to its TOML type
fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
    match key {
        "prune.interval_seconds" => {
            let seconds: u64 = value
                .parse()
                .context("interval_seconds must be a positive integer")?;
            if seconds == 0 {
                anyhow::bail!("interval_seconds must be greater than 0");
            }
            Ok(toml::Value::Integer(to_toml_int(seconds)?))
        }
        "prune.min_interval_seconds" => {
            let seconds: u64 = value
                .parse()
                .context("min_interval_seconds must be a non-negative integer")?;
            Ok(toml::Value::Integer(to_toml_int(seconds)?))
        }
        "output.color_enabled" | "output.progress_enabled" => {
            let enabled: bool = value.parse().context("Value must be 'true' or 'false'")?;
            Ok(toml::Value::Boolean(enabled))
        }
        "storage.data_dir" => {
            if value.trim().is_empty() {
                anyhow::bail!("data_dir must not be empty");
            }
            Ok(toml::Value::String(value.to_string()))
        }
        _ => anyhow::bail!("Unknown configuration key: {key}"),
    }
}

fn to_toml_int(value: u64) -> Result<i64> {
    i64::try_from(value).context("Value is too large")
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.prune.interval_seconds, 3600);
        assert_eq!(config.prune.min_interval_seconds, 60);
        assert!(config.output.progress_enabled);
        assert!(config.storage.data_dir.is_none());
        assert_eq!(
            config.service_options().min_prune_interval,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(PathBuf::from("/tmp/thumbs-root"));
        let paths = config.app_paths();
        assert_eq!(paths.data_root, PathBuf::from("/tmp/thumbs-root"));
        assert_eq!(paths.cache_dir, PathBuf::from("/tmp/thumbs-root/thumbnails"));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse_config_value("prune.interval_seconds", "0").is_err());
        assert!(parse_config_value("prune.interval_seconds", "soon").is_err());
        assert!(parse_config_value("output.color_enabled", "yes").is_err());
        assert!(parse_config_value("storage.data_dir", "  ").is_err());
        assert!(parse_config_value("nope.key", "1").is_err());
    }

    #[test]
    fn test_set_creates_nested_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut manager = ConfigManager::with_path(path.clone());

        manager.set("prune.min_interval_seconds", "0").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[prune]"));
        assert!(content.contains("min_interval_seconds = 0"));
    }
}
