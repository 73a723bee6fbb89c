//! Progress types emitted by the generation pipeline and the eviction engine
//!
//! These are plain snapshots: every emission hands subscribers an owned
//! copy, never a reference into state that keeps changing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lifecycle state of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl GenerationStatus {
    /// Whether a run is currently in progress (running or paused)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Aggregate counters for one generation run
///
/// `completed` counts processed items, including skipped and failed ones;
/// successes are `completed - errors`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub current_file: Option<String>,
    pub estimated_seconds_remaining: Option<u64>,
    pub status: GenerationStatus,
}

impl GenerationProgress {
    /// Fresh counters for a run over `total` items
    pub fn started(total: usize) -> Self {
        Self {
            total,
            status: GenerationStatus::Running,
            ..Self::default()
        }
    }

    /// Items processed without error
    pub fn succeeded(&self) -> usize {
        self.completed.saturating_sub(self.errors)
    }

    /// Items not yet processed
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Percentage of processed items (0.0 for an empty run)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Stage of an eviction run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrunePhase {
    Scan,
    Ttl,
    Size,
    Done,
    Error,
}

/// Phase-tagged progress for one eviction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneProgress {
    pub phase: PrunePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PruneProgress {
    pub fn new(phase: PrunePhase) -> Self {
        Self {
            phase,
            scanned_files: None,
            total_files: None,
            total_bytes: None,
            removed_files: None,
            removed_bytes: None,
            remaining_bytes: None,
            current_file: None,
            message: None,
        }
    }

    pub fn with_scanned(mut self, scanned_files: usize) -> Self {
        self.scanned_files = Some(scanned_files);
        self
    }

    pub fn with_totals(mut self, total_files: usize, total_bytes: u64) -> Self {
        self.total_files = Some(total_files);
        self.total_bytes = Some(total_bytes);
        self
    }

    pub fn with_removed(mut self, removed_files: usize, removed_bytes: u64) -> Self {
        self.removed_files = Some(removed_files);
        self.removed_bytes = Some(removed_bytes);
        self
    }

    pub fn with_remaining(mut self, remaining_bytes: u64) -> Self {
        self.remaining_bytes = Some(remaining_bytes);
        self
    }

    pub fn with_current_file(mut self, path: &Path) -> Self {
        self.current_file = Some(path.display().to_string());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A single file that failed to produce a thumbnail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailError {
    pub file_path: String,
    pub file_name: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ThumbnailError {
    pub fn new(path: &Path, error: impl ToString) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            file_path: path.display().to_string(),
            file_name,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_progress() {
        let progress = GenerationProgress::started(10);
        assert_eq!(progress.total, 10);
        assert_eq!(progress.status, GenerationStatus::Running);
        assert_eq!(progress.remaining(), 10);
        assert_eq!(progress.percentage(), 0.0);
    }

    #[test]
    fn test_succeeded_excludes_errors() {
        let progress = GenerationProgress {
            total: 5,
            completed: 5,
            skipped: 1,
            errors: 2,
            ..GenerationProgress::default()
        };
        assert_eq!(progress.succeeded(), 3);
    }

    #[test]
    fn test_generation_progress_serializes_camel_case() {
        let json = serde_json::to_value(GenerationProgress::started(2)).unwrap();
        assert_eq!(json["status"], "running");
        assert!(json.get("currentFile").is_some());
        assert!(json["estimatedSecondsRemaining"].is_null());
    }

    #[test]
    fn test_prune_progress_omits_unset_fields() {
        let json = serde_json::to_value(
            PruneProgress::new(PrunePhase::Scan)
                .with_scanned(100)
                .with_totals(100, 4096),
        )
        .unwrap();

        assert_eq!(json["phase"], "scan");
        assert_eq!(json["scannedFiles"], 100);
        assert_eq!(json["totalBytes"], 4096);
        assert!(json.get("removedFiles").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_thumbnail_error_extracts_file_name() {
        let error = ThumbnailError::new(Path::new("/photos/2024/IMG_0001.CR2"), "bad header");
        assert_eq!(error.file_name, "IMG_0001.CR2");
        assert_eq!(error.file_path, "/photos/2024/IMG_0001.CR2");
        assert_eq!(error.error, "bad header");
    }
}
