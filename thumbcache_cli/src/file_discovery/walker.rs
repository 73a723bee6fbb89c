//! Directory walking with pattern filtering

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::{
    DiscoveredFile, DiscoveryError, Result,
    extensions::{default_media_extensions, extensions_to_patterns},
    filter::FileFilter,
};

/// Options for file discovery
#[derive(Debug, Clone)]
pub struct FileDiscoveryOptions {
    /// Patterns to include (glob patterns)
    pub include_patterns: Vec<String>,
    /// Patterns to exclude (glob patterns, override includes)
    pub exclude_patterns: Vec<String>,
    /// Use default media extensions when no include patterns specified
    pub use_defaults: bool,
    /// Descend into subdirectories
    pub recursive: bool,
    pub follow_links: bool,
}

impl Default for FileDiscoveryOptions {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            use_defaults: true,
            recursive: false,
            follow_links: false,
        }
    }
}

impl FileDiscoveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    fn filter(&self) -> Result<FileFilter> {
        let include = if self.include_patterns.is_empty() && self.use_defaults {
            extensions_to_patterns(default_media_extensions())
        } else {
            self.include_patterns.clone()
        };
        FileFilter::new(&include, &self.exclude_patterns)
    }
}

/// Streaming enumeration of the matching files under one directory
pub struct FileDiscovery {
    walker: walkdir::IntoIter,
    filter: FileFilter,
}

impl FileDiscovery {
    pub fn new(path: &Path, options: &FileDiscoveryOptions) -> Result<Self> {
        if !path.exists() {
            return Err(DiscoveryError::PathNotFound(path.to_path_buf()));
        }

        let mut walker = WalkDir::new(path)
            .follow_links(options.follow_links)
            .sort_by_file_name();
        if !options.recursive {
            walker = walker.max_depth(1);
        }

        Ok(Self {
            walker: walker.into_iter(),
            filter: options.filter()?,
        })
    }

    fn accepts(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file() && self.filter.should_include(entry.path())
    }
}

impl Iterator for FileDiscovery {
    type Item = Result<DiscoveredFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Walk error: {e}");
                    continue;
                }
            };

            if !self.accepts(&entry) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    return Some(Ok(DiscoveredFile {
                        path: entry.into_path(),
                        size: metadata.len(),
                    }));
                }
                Err(e) => {
                    log::warn!("Failed to read metadata for {:?}: {e}", entry.path());
                }
            }
        }
    }
}

/// Expand command line inputs into the list of source files
///
/// Files named explicitly are taken as-is, without pattern filtering.
/// Directories are walked. The result keeps first-seen order and holds no
/// duplicates.
pub fn discover_inputs(inputs: &[PathBuf], options: &FileDiscoveryOptions) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for found in FileDiscovery::new(input, options)? {
                let path = found?.path;
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        } else if input.exists() {
            if seen.insert(input.clone()) {
                files.push(input.clone());
            }
        } else {
            return Err(DiscoveryError::PathNotFound(input.clone()));
        }
    }

    Ok(files)
}
