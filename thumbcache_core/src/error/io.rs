//! I/O related error types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// I/O error with additional context
#[derive(Error, Debug)]
#[error("{}", format_io_error(self))]
pub struct IoError {
    /// The kind of I/O error
    pub kind: IoErrorKind,
    /// Path associated with the error (if any)
    pub path: Option<PathBuf>,
    /// Underlying I/O error (if any)
    #[source]
    pub source: Option<std::io::Error>,
}

/// Kind of I/O error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoErrorKind {
    /// File not found
    FileNotFound,
    /// Permission denied
    PermissionDenied,
    /// A directory was expected (cache root, data root)
    NotADirectory,
    /// A regular file was expected (thumbnail source)
    NotAFile,
    /// Generic I/O error
    Other,
}

impl IoError {
    /// Create a file not found error
    pub fn file_not_found(path: &Path) -> Self {
        Self {
            kind: IoErrorKind::FileNotFound,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create a not-a-directory error
    pub fn not_a_directory(path: &Path) -> Self {
        Self {
            kind: IoErrorKind::NotADirectory,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create a not-a-regular-file error
    pub fn not_a_file(path: &Path) -> Self {
        Self {
            kind: IoErrorKind::NotAFile,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create an I/O error from a standard I/O error
    pub fn from_std(source: std::io::Error) -> Self {
        let kind = match source.kind() {
            std::io::ErrorKind::NotFound => IoErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other,
        };

        Self {
            kind,
            path: None,
            source: Some(source),
        }
    }

    /// Create an I/O error with a path
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}

fn format_io_error(error: &IoError) -> String {
    match (&error.kind, &error.path) {
        (IoErrorKind::FileNotFound, Some(path)) => {
            format!("File not found: {}", path.display())
        }
        (IoErrorKind::FileNotFound, None) => "File not found".to_string(),
        (IoErrorKind::PermissionDenied, Some(path)) => {
            format!("Permission denied for file: {}", path.display())
        }
        (IoErrorKind::PermissionDenied, None) => "Permission denied".to_string(),
        (IoErrorKind::NotADirectory, Some(path)) => {
            format!("Not a directory: {}", path.display())
        }
        (IoErrorKind::NotADirectory, None) => "Not a directory".to_string(),
        (IoErrorKind::NotAFile, Some(path)) => {
            format!("Not a regular file: {}", path.display())
        }
        (IoErrorKind::NotAFile, None) => "Not a regular file".to_string(),
        (IoErrorKind::Other, path) => {
            let location = path
                .as_ref()
                .map(|p| format!(" ({})", p.display()))
                .unwrap_or_default();
            if let Some(source) = &error.source {
                format!("I/O error{location}: {source}")
            } else {
                format!("I/O error{location}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_file_not_found_error() {
        let path = Path::new("/photos/beach.jpg");
        let error = IoError::file_not_found(path);

        assert_eq!(error.kind, IoErrorKind::FileNotFound);
        assert_eq!(error.path, Some(path.to_path_buf()));
        assert!(error.source.is_none());
        assert!(error.to_string().contains("File not found"));
        assert!(error.to_string().contains("/photos/beach.jpg"));
    }

    #[test]
    fn test_not_a_directory_error() {
        let error = IoError::not_a_directory(Path::new("/cache/file.bin"));
        assert_eq!(error.kind, IoErrorKind::NotADirectory);
        assert!(error.to_string().contains("Not a directory"));
    }

    #[test]
    fn test_from_std_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "Not found");
        let error = IoError::from_std(io_error);

        assert_eq!(error.kind, IoErrorKind::FileNotFound);
        assert!(error.path.is_none());
        assert!(error.source.is_some());
    }

    #[test]
    fn test_other_error_mentions_path() {
        let io_error = io::Error::other("disk full");
        let path = Path::new("/cache/ab/ab12.thumb");
        let error = IoError::from_std(io_error).with_path(path);

        assert_eq!(error.kind, IoErrorKind::Other);
        assert!(error.to_string().contains("/cache/ab/ab12.thumb"));
        assert!(error.to_string().contains("disk full"));
    }
}
