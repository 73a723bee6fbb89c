//! Include/exclude filtering with case-insensitive glob sets

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

use super::{DiscoveryError, Result};

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(false)
            .build()
            .map_err(|e| DiscoveryError::InvalidPattern(format!("{pattern}: {e}")))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| DiscoveryError::InvalidPattern(e.to_string()))
}

/// Include and exclude patterns; excludes win
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FileFilter {
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include_patterns)?,
            exclude: build_globset(exclude_patterns)?,
        })
    }

    /// Excluded paths never match. Without include patterns every other
    /// path matches.
    pub fn should_include(&self, path: &Path) -> bool {
        if let Some(exclude) = &self.exclude
            && exclude.is_match(path)
        {
            return false;
        }

        self.include
            .as_ref()
            .is_none_or(|include| include.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_is_case_insensitive() {
        let filter = FileFilter::new(&patterns(&["*.png"]), &[]).unwrap();

        assert!(filter.should_include(Path::new("shot.png")));
        assert!(filter.should_include(Path::new("SHOT.PNG")));
        assert!(filter.should_include(Path::new("/photos/2024/shot.Png")));
        assert!(!filter.should_include(Path::new("shot.jpg")));
    }

    #[test]
    fn test_exclude_overrides_include() {
        let filter = FileFilter::new(&patterns(&["*.jpg"]), &patterns(&["**/drafts/*"])).unwrap();

        assert!(filter.should_include(Path::new("album/a.jpg")));
        assert!(!filter.should_include(Path::new("album/drafts/a.jpg")));
    }

    #[test]
    fn test_no_patterns_include_everything() {
        let filter = FileFilter::new(&[], &[]).unwrap();
        assert!(filter.should_include(Path::new("anything.bin")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = FileFilter::new(&patterns(&["[unclosed"]), &[]).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPattern(_)));
    }
}
