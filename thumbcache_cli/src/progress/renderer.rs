//! Terminal rendering of bus events
//!
//! Generation progress drives a bar, prune progress drives a spinner and
//! per-file failures are printed above both.

use super::utils::{format_bytes, format_eta};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use thumbcache_core::{Event, GenerationProgress, PrunePhase, PruneProgress, ThumbnailError};
use tokio::sync::mpsc;

/// Render events from a channel until it closes
///
/// Returns the number of per-file errors seen.
pub async fn render_events(mut rx: mpsc::Receiver<Event>, show_bars: bool) -> usize {
    let mut renderer = ProgressRenderer::new(show_bars);

    while let Some(event) = rx.recv().await {
        renderer.handle_event(event);
    }

    renderer.finish()
}

/// Turns events into progress bars and status lines
pub struct ProgressRenderer {
    show_bars: bool,
    generation_bar: Option<ProgressBar>,
    prune_spinner: Option<ProgressBar>,
    errors: usize,
}

impl ProgressRenderer {
    /// With `show_bars == false` only errors are printed
    pub fn new(show_bars: bool) -> Self {
        Self {
            show_bars,
            generation_bar: None,
            prune_spinner: None,
            errors: 0,
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ThumbnailProgress(progress) => self.update_generation(&progress),
            Event::ThumbnailError(error) => self.report_error(&error),
            Event::CachePruneProgress(progress) => self.update_prune(&progress),
        }
    }

    pub fn errors_seen(&self) -> usize {
        self.errors
    }

    fn update_generation(&mut self, progress: &GenerationProgress) {
        if !self.show_bars {
            return;
        }

        let bar = self.generation_bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(progress.total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files | {percent}% | ETA {prefix}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            bar
        });

        bar.set_length(progress.total as u64);
        bar.set_position(progress.completed as u64);
        bar.set_prefix(format_eta(progress.estimated_seconds_remaining));

        let status = format!("{:?}", progress.status);
        match &progress.current_file {
            Some(file) => bar.set_message(format!("{} {}", status.bold(), file.cyan())),
            None => bar.set_message(status.bold().to_string()),
        }
    }

    fn report_error(&mut self, error: &ThumbnailError) {
        self.errors += 1;
        let line = format!("{} {}: {}", "✗".red(), error.file_name, error.error);
        match &self.generation_bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn update_prune(&mut self, progress: &PruneProgress) {
        if !self.show_bars {
            return;
        }

        let spinner = self.prune_spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });

        spinner.set_message(describe_prune(progress));
        if matches!(progress.phase, PrunePhase::Done | PrunePhase::Error) {
            spinner.finish_and_clear();
            self.prune_spinner = None;
        }
    }

    /// Close any open bar and return the error count
    pub fn finish(self) -> usize {
        if let Some(bar) = self.generation_bar {
            bar.finish_and_clear();
        }
        if let Some(spinner) = self.prune_spinner {
            spinner.finish_and_clear();
        }
        self.errors
    }
}

/// One-line description of a prune event
pub fn describe_prune(progress: &PruneProgress) -> String {
    let phase = match progress.phase {
        PrunePhase::Scan => "Scanning",
        PrunePhase::Ttl => "Removing expired",
        PrunePhase::Size => "Enforcing size cap",
        PrunePhase::Done => "Done",
        PrunePhase::Error => "Failed",
    };

    let mut parts = vec![phase.bold().to_string()];
    if let Some(scanned) = progress.scanned_files {
        parts.push(format!("{scanned} files scanned"));
    }
    if let Some(removed) = progress.removed_files {
        parts.push(format!(
            "{removed} removed ({})",
            format_bytes(progress.removed_bytes.unwrap_or(0))
        ));
    }
    if let Some(remaining) = progress.remaining_bytes {
        parts.push(format!("{} remaining", format_bytes(remaining)));
    }
    if let Some(message) = &progress.message {
        parts.push(message.clone());
    }
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_errors_counted_without_bars() {
        let mut renderer = ProgressRenderer::new(false);
        renderer.handle_event(Event::ThumbnailProgress(GenerationProgress::started(2)));
        renderer.handle_event(Event::ThumbnailError(ThumbnailError::new(
            Path::new("/src/a.png"),
            "bad header",
        )));

        assert_eq!(renderer.errors_seen(), 1);
        assert_eq!(renderer.finish(), 1);
    }

    #[test]
    fn test_describe_prune() {
        colored::control::set_override(false);
        let progress = PruneProgress::new(PrunePhase::Size)
            .with_removed(2, 2048)
            .with_remaining(1024);

        assert_eq!(
            describe_prune(&progress),
            "Enforcing size cap | 2 removed (2.00 KB) | 1.00 KB remaining"
        );
    }
}
