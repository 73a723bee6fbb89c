//! Cache directories and source trees with controlled sizes and ages

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A file placed by [`CacheFixtureBuilder`]
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Builder for a cache directory whose files have known sizes and mtimes
pub struct CacheFixtureBuilder {
    now: SystemTime,
    files: Vec<(String, u64, Duration)>,
}

impl Default for CacheFixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheFixtureBuilder {
    /// Create a new builder; ages are measured back from the current time
    pub fn new() -> Self {
        Self {
            now: SystemTime::now(),
            files: Vec::new(),
        }
    }

    /// Add a file `size` bytes long, last modified `age` ago
    ///
    /// `name` may contain `/` to place the file in a subdirectory.
    pub fn with_file(mut self, name: &str, size: u64, age: Duration) -> Self {
        self.files.push((name.to_string(), size, age));
        self
    }

    /// Add `count` files of `size` bytes, each one second younger than the last
    pub fn with_files(mut self, prefix: &str, count: usize, size: u64, oldest: Duration) -> Self {
        for i in 0..count {
            let age = oldest.saturating_sub(Duration::from_secs(i as u64));
            self.files.push((format!("{prefix}{i:04}.thumb"), size, age));
        }
        self
    }

    /// Write every file into a fresh temporary directory
    pub fn build(self) -> CacheFixture {
        let dir = TempDir::new().expect("Failed to create fixture directory");
        let now = self.now;
        let files = self
            .files
            .into_iter()
            .map(|(name, size, age)| write_aged(dir.path(), &name, size, now - age))
            .collect();

        CacheFixture { dir, files }
    }
}

fn write_aged(root: &Path, name: &str, size: u64, modified: SystemTime) -> FixtureFile {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture subdirectory");
    }
    fs::write(&path, vec![0u8; size as usize]).expect("Failed to write fixture file");
    filetime::set_file_mtime(&path, FileTime::from_system_time(modified))
        .expect("Failed to set fixture mtime");

    FixtureFile {
        path,
        size,
        modified,
    }
}

/// A populated cache directory, removed on drop
pub struct CacheFixture {
    dir: TempDir,
    files: Vec<FixtureFile>,
}

impl CacheFixture {
    pub fn builder() -> CacheFixtureBuilder {
        CacheFixtureBuilder::new()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Files in the order they were added
    pub fn files(&self) -> &[FixtureFile] {
        &self.files
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Names (relative to the root) of the fixture files still on disk
    pub fn surviving(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.path.exists())
            .map(|f| {
                f.path
                    .strip_prefix(self.dir.path())
                    .unwrap_or(&f.path)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }
}

/// A directory of source media files to generate thumbnails for
pub struct SourceTree {
    dir: TempDir,
    paths: Vec<PathBuf>,
}

impl SourceTree {
    /// Create `count` small files named `file-NNNN.<extension>`
    pub fn with_files(count: usize, extension: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create source directory");
        let paths = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("file-{i:04}.{extension}"));
                fs::write(&path, format!("source {i}")).expect("Failed to write source file");
                path
            })
            .collect();

        Self { dir, paths }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    /// A path inside the tree that does not exist
    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
