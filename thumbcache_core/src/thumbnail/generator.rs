//! Thumbnail generators
//!
//! A generator turns one source file into artifact bytes. It does not touch
//! the cache directory; [`ThumbnailStore`](super::ThumbnailStore) persists
//! what it returns.

use crate::error::{Error, InternalError, IoError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Produces thumbnail bytes for one source file
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Generate the artifact for `source`
    async fn generate(&self, source: &Path) -> Result<Vec<u8>>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// Metadata side-car written in place of real image data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarRecord {
    pub source: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

/// Writes a small JSON record describing the source file
///
/// Works for any media type and never reads file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarGenerator;

#[async_trait]
impl ThumbnailGenerator for SidecarGenerator {
    async fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        let metadata = tokio::fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Io(IoError::file_not_found(source))
            } else {
                Error::Io(IoError::from_std(e).with_path(source))
            }
        })?;

        if !metadata.is_file() {
            return Err(Error::Io(IoError::not_a_file(source)));
        }

        let record = SidecarRecord {
            source: source.display().to_string(),
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            generated_at: Utc::now(),
        };

        Ok(serde_json::to_vec(&record)?)
    }

    fn name(&self) -> &'static str {
        "sidecar"
    }
}

/// Edge length of the box image thumbnails are scaled to fit
#[cfg(feature = "image")]
pub const THUMBNAIL_SIZE: u32 = 256;

/// Decodes raster images and encodes a scaled PNG
#[cfg(feature = "image")]
#[derive(Debug, Clone, Copy)]
pub struct ImageGenerator {
    size: u32,
}

#[cfg(feature = "image")]
impl Default for ImageGenerator {
    fn default() -> Self {
        Self {
            size: THUMBNAIL_SIZE,
        }
    }
}

#[cfg(feature = "image")]
impl ImageGenerator {
    pub fn with_size(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    fn render(source: &Path, size: u32) -> Result<Vec<u8>> {
        let img = image::open(source)
            .map_err(|e| Error::Internal(InternalError::generation(source, e.to_string())))?;
        let thumbnail = img.thumbnail(size, size);

        let mut buffer = std::io::Cursor::new(Vec::new());
        thumbnail
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| Error::Internal(InternalError::generation(source, e.to_string())))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(feature = "image")]
#[async_trait]
impl ThumbnailGenerator for ImageGenerator {
    async fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        let path = source.to_path_buf();
        let size = self.size;
        tokio::task::spawn_blocking(move || Self::render(&path, size)).await?
    }

    fn name(&self) -> &'static str {
        "image"
    }
}

/// Wrap an arbitrary failure as a per-file generation error
pub fn generation_error(source: &Path, message: impl Into<String>) -> Error {
    Error::Internal(InternalError::generation(source, message))
}
