//! Mock thumbnail generators

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thumbcache_core::error::InternalError;
use thumbcache_core::thumbnail::generator::generation_error;
use thumbcache_core::{Error, Result, ThumbnailGenerator};
use tokio::sync::Semaphore;

/// Fails every source whose file name contains `marker`
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    marker: String,
}

impl FailingGenerator {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }
}

#[async_trait]
impl ThumbnailGenerator for FailingGenerator {
    async fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.contains(&self.marker) {
            Err(generation_error(source, "simulated decode failure"))
        } else {
            Ok(format!("thumb:{}", source.display()).into_bytes())
        }
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fails with an error not tied to any file, aborting the run
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenGenerator;

#[async_trait]
impl ThumbnailGenerator for BrokenGenerator {
    async fn generate(&self, _source: &Path) -> Result<Vec<u8>> {
        Err(Error::Internal(InternalError::assertion(
            "generator backend unavailable",
        )))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Blocks every generation until the test releases it
///
/// Tracks how many generations started and the peak number in flight.
#[derive(Debug, Clone)]
pub struct GatedGenerator {
    permits: Arc<Semaphore>,
    started: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for GatedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedGenerator {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let `count` blocked or future generations finish
    pub fn release(&self, count: usize) {
        self.permits.add_permits(count);
    }

    /// Number of generations that have begun
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Highest number of generations in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` generations have begun
    pub async fn wait_started(&self, count: usize) {
        while self.started() < count {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }
}

#[async_trait]
impl ThumbnailGenerator for GatedGenerator {
    async fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let permit = self.permits.acquire().await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        match permit {
            Ok(permit) => {
                permit.forget();
                Ok(format!("thumb:{}", source.display()).into_bytes())
            }
            Err(_) => Err(generation_error(source, "gate closed")),
        }
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failing_generator_matches_marker() {
        let generator = FailingGenerator::new("bad");
        assert!(generator.generate(Path::new("/x/good.jpg")).await.is_ok());

        let err = generator.generate(Path::new("/x/bad.jpg")).await.unwrap_err();
        assert!(err.is_per_file());
    }

    #[tokio::test]
    async fn test_broken_generator_is_not_per_file() {
        let err = BrokenGenerator
            .generate(Path::new("/x/a.jpg"))
            .await
            .unwrap_err();
        assert!(!err.is_per_file());
    }

    #[tokio::test]
    async fn test_gated_generator_blocks_until_released() {
        let generator = GatedGenerator::new();
        let task = {
            let generator = generator.clone();
            tokio::spawn(async move { generator.generate(Path::new("/x/a.jpg")).await })
        };

        generator.wait_started(1).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());

        generator.release(1);
        assert!(task.await.unwrap().is_ok());
        assert_eq!(generator.peak(), 1);
    }
}
