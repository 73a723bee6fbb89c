//! Command orchestrators
//!
//! Each orchestrator drives one group of subcommands against a
//! [`ThumbnailService`] built from the application config.

pub mod cache_orchestrator;
pub mod generate_orchestrator;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use thumbcache_core::{ThumbnailGenerator, ThumbnailService};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// The generator compiled into this binary
pub fn default_generator() -> Arc<dyn ThumbnailGenerator> {
    #[cfg(feature = "image")]
    {
        Arc::new(thumbcache_core::ImageGenerator::default())
    }
    #[cfg(not(feature = "image"))]
    {
        Arc::new(thumbcache_core::SidecarGenerator)
    }
}

/// Service over the configured data root, creating its directories
pub fn build_service(config: &AppConfig) -> Result<ThumbnailService> {
    let paths = config.app_paths();
    paths.ensure_dirs().with_context(|| {
        format!(
            "Failed to prepare data directory {}",
            paths.data_root.display()
        )
    })?;
    log::debug!(
        "Using data root {} and cache {}",
        paths.data_root.display(),
        paths.cache_dir.display()
    );

    Ok(ThumbnailService::new(
        paths,
        default_generator(),
        config.service_options(),
    ))
}

/// Print `value` as pretty JSON on stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
