//! Cache maintenance and settings commands

use super::{OutputFormat, print_json};
use crate::progress::{self, days_to_seconds, format_bytes, format_duration, mb_to_bytes};
use anyhow::{Result, anyhow};
use colored::*;
use std::time::Duration;
use thumbcache_core::{
    CacheInfo, CachePolicy, ClearOutcome, PruneOptions, PruneOutcome, Reply, ThumbnailConfig,
    ThumbnailService,
};

/// Unwrap a service reply into an `anyhow` result
fn accept<T>(reply: Reply<T>) -> Result<T> {
    reply.into_result().map_err(|e| anyhow!(e))
}

pub struct CacheOrchestrator {
    service: ThumbnailService,
    format: OutputFormat,
    show_progress: bool,
}

impl CacheOrchestrator {
    pub fn new(service: ThumbnailService, format: OutputFormat, show_progress: bool) -> Self {
        Self {
            service,
            format,
            show_progress,
        }
    }

    /// Enforce the stored policy now
    pub async fn prune(&self, force: bool) -> Result<PruneOutcome> {
        let renderer = progress::attach(self.service.bus(), self.show_progress);
        let reply = self.service.prune(PruneOptions { force }).await;
        renderer.finish().await;

        let outcome = accept(reply)?;
        match self.format {
            OutputFormat::Json => print_json(&outcome)?,
            OutputFormat::Human if outcome.skipped => {
                eprintln!("{}", "Prune skipped: the cache was pruned recently (use --force)".yellow());
            }
            OutputFormat::Human => {
                eprintln!(
                    "{} {} files ({})",
                    "Removed".bold().green(),
                    outcome.removed_files,
                    format_bytes(outcome.removed_bytes)
                );
                if let Some(remaining) = outcome.total_remaining_bytes {
                    eprintln!("Remaining: {}", format_bytes(remaining));
                }
            }
        }
        Ok(outcome)
    }

    /// Describe cache usage
    pub async fn info(&self) -> Result<CacheInfo> {
        let info = accept(self.service.get_info().await)?;
        match self.format {
            OutputFormat::Json => print_json(&info)?,
            OutputFormat::Human => {
                println!("{}", "Thumbnail cache".bold().blue());
                println!("Directory: {}", info.dir);
                println!("Files:     {}", info.file_count);
                println!("Size:      {}", format_bytes(info.total_size));
                print_policy(&info.policy);
            }
        }
        Ok(info)
    }

    /// Delete every cached thumbnail
    pub async fn clear(&self) -> Result<ClearOutcome> {
        let outcome = accept(self.service.clear().await)?;
        match self.format {
            OutputFormat::Json => print_json(&outcome)?,
            OutputFormat::Human => {
                eprintln!(
                    "{} {} files ({})",
                    "Cleared".bold().green(),
                    outcome.removed_files,
                    format_bytes(outcome.removed_bytes)
                );
                if outcome.failed_files > 0 {
                    eprintln!(
                        "{}",
                        format!("{} files could not be deleted", outcome.failed_files).red()
                    );
                }
            }
        }
        Ok(outcome)
    }

    pub fn show_policy(&self) -> Result<CachePolicy> {
        let policy = accept(self.service.get_policy())?;
        match self.format {
            OutputFormat::Json => print_json(&policy)?,
            OutputFormat::Human => print_policy(&policy),
        }
        Ok(policy)
    }

    /// Update the fields that were given, keeping the others
    pub fn set_policy(&self, max_size_mb: Option<u64>, ttl_days: Option<u64>) -> Result<CachePolicy> {
        if max_size_mb.is_none() && ttl_days.is_none() {
            anyhow::bail!("Nothing to change: pass --max-size-mb and/or --ttl-days");
        }

        let mut policy = accept(self.service.get_policy())?;
        if let Some(mb) = max_size_mb {
            policy = policy.with_max_size_bytes(mb_to_bytes(mb));
        }
        if let Some(days) = ttl_days {
            policy = policy.with_ttl_seconds(days_to_seconds(days));
        }

        let saved = accept(self.service.set_policy(policy))?;
        eprintln!("{}", "Policy saved".green());
        self.print_or_json(&saved, print_policy)?;
        Ok(saved)
    }

    pub fn show_concurrency(&self) -> Result<ThumbnailConfig> {
        let config = accept(self.service.get_config())?;
        self.print_or_json(&config, |c| println!("Concurrency: {}", c.concurrency))?;
        Ok(config)
    }

    pub fn set_concurrency(&self, concurrency: usize) -> Result<ThumbnailConfig> {
        let config = accept(self.service.set_config(ThumbnailConfig { concurrency }))?;
        eprintln!("{}", format!("Concurrency set to {}", config.concurrency).green());
        Ok(config)
    }

    /// Prune on a timer until Ctrl-C
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        eprintln!(
            "Pruning {} every {} (Ctrl-C to stop)",
            self.service.paths().cache_dir.display(),
            format_duration(interval.as_secs())
        );

        let renderer = progress::attach(self.service.bus(), self.show_progress);
        let handle = self.service.spawn_auto_prune(interval);

        tokio::signal::ctrl_c().await?;
        eprintln!("{}", "Stopping...".yellow());
        handle.shutdown().await;
        renderer.finish().await;
        Ok(())
    }

    fn print_or_json<T: serde::Serialize>(&self, value: &T, human: impl Fn(&T)) -> Result<()> {
        match self.format {
            OutputFormat::Json => print_json(value),
            OutputFormat::Human => {
                human(value);
                Ok(())
            }
        }
    }
}

fn print_policy(policy: &CachePolicy) {
    match policy.size_limit() {
        Some(limit) => println!("Max size:  {}", format_bytes(limit)),
        None => println!("Max size:  unlimited"),
    }
    match policy.ttl() {
        Some(ttl) => println!("TTL:       {}", format_duration(ttl.as_secs())),
        None => println!("TTL:       never expires"),
    }
}
