//! Generate command orchestrator
//!
//! Discovers source files, runs them through the generation pipeline with a
//! live progress display and prints a summary. Ctrl-C cancels the run.

use super::{OutputFormat, print_json};
use crate::file_discovery::{FileDiscoveryOptions, discover_inputs};
use crate::progress::{self, format_duration};
use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;
use thumbcache_core::{GenerationProgress, GenerationStatus, ThumbnailService};

/// Options for one generate invocation
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub inputs: Vec<PathBuf>,
    pub discovery: FileDiscoveryOptions,
    pub show_progress: bool,
    pub format: OutputFormat,
}

pub struct GenerateOrchestrator {
    service: ThumbnailService,
}

impl GenerateOrchestrator {
    pub fn new(service: ThumbnailService) -> Self {
        Self { service }
    }

    /// Generate thumbnails for every discovered file
    ///
    /// Per-file failures are reported and counted; only a failed batch is
    /// an error.
    pub async fn run(&self, options: GenerateOptions) -> Result<GenerationProgress> {
        let files = discover_inputs(&options.inputs, &options.discovery)
            .context("File discovery failed")?;

        if files.is_empty() {
            eprintln!("{}", "No matching files found.".yellow());
            return Ok(self.service.pipeline().progress());
        }
        log::debug!("Discovered {} source files", files.len());
        if options.format == OutputFormat::Human {
            eprintln!("Found {} file(s)", files.len());
        }

        let renderer = progress::attach(self.service.bus(), options.show_progress);
        let interrupt = self.cancel_on_interrupt();

        let started = Instant::now();
        let result = self.service.run(files).await;
        let elapsed = started.elapsed();

        interrupt.abort();
        renderer.finish().await;

        match options.format {
            OutputFormat::Json => print_json(&result)?,
            OutputFormat::Human => print_summary(&result, elapsed.as_secs()),
        }

        if result.status == GenerationStatus::Error {
            anyhow::bail!("Thumbnail generation aborted after {} files", result.completed);
        }
        Ok(result)
    }

    fn cancel_on_interrupt(&self) -> tokio::task::JoinHandle<()> {
        let service = self.service.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "Cancelling...".yellow());
                service.cancel();
            }
        })
    }
}

fn print_summary(result: &GenerationProgress, elapsed_secs: u64) {
    let generated = result.succeeded().saturating_sub(result.skipped);

    let headline = match result.status {
        GenerationStatus::Completed => "Thumbnails ready".bold().green(),
        GenerationStatus::Error => "Generation failed".bold().red(),
        _ => "Generation cancelled".bold().yellow(),
    };
    eprintln!("\n{headline}");
    eprintln!("Processed: {}/{}", result.completed, result.total);
    eprintln!("Generated: {generated}");
    eprintln!("Reused:    {}", result.skipped);
    if result.errors > 0 {
        eprintln!("Failed:    {}", result.errors.to_string().red());
    } else {
        eprintln!("Failed:    0");
    }
    eprintln!("Time:      {}", format_duration(elapsed_secs));
}
