//! Internal library error types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Thumbnail generation failed for one source file
    #[error("Thumbnail generation failed for '{}': {message}", path.display())]
    Generation { path: PathBuf, message: String },

    /// JSON (de)serialization failure
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// A blocking or spawned task panicked or was aborted
    #[error("Background task failed: {message}")]
    TaskJoin { message: String },

    /// Internal assertion failure
    #[error("Internal assertion failed: {message}")]
    Assertion { message: String },
}

impl InternalError {
    /// Create a generation error for a source file
    pub fn generation(path: &Path, message: impl Into<String>) -> Self {
        Self::Generation {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a task join error
    pub fn task_join(message: impl Into<String>) -> Self {
        Self::TaskJoin {
            message: message.into(),
        }
    }

    /// Create an internal assertion failure error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error() {
        let error = InternalError::generation(Path::new("/photos/a.cr2"), "unsupported format");
        assert!(error.to_string().contains("Thumbnail generation failed"));
        assert!(error.to_string().contains("/photos/a.cr2"));
        assert!(error.to_string().contains("unsupported format"));
    }

    #[test]
    fn test_task_join_error() {
        let error = InternalError::task_join("scan worker panicked");
        assert!(error.to_string().contains("Background task failed"));
    }

    #[test]
    fn test_assertion_error() {
        let error = InternalError::assertion("Invariant violated");
        assert!(error.to_string().contains("Internal assertion failed"));
        assert!(error.to_string().contains("Invariant violated"));
    }
}
