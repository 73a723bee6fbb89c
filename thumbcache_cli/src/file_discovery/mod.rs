//! Source file discovery
//!
//! Expands the paths given on the command line into the files a thumbnail
//! run should cover, using include/exclude glob patterns and a default set
//! of media extensions.

mod extensions;
mod filter;
mod walker;

pub use extensions::default_media_extensions;
pub use filter::FileFilter;
pub use walker::{FileDiscovery, FileDiscoveryOptions, discover_inputs};

use std::path::PathBuf;

/// A file found during discovery
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Error type for file discovery operations
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
