//! Error types for the thumbnail cache core
//!
//! This module contains all error types used throughout the library, organized
//! into logical categories for better maintainability and clarity.

use thiserror::Error;

pub mod internal;
pub mod io;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the thumbnail cache core
///
/// Errors are categorized into three main types:
/// - I/O errors: cache directory, artifact and config file operations
/// - Validation errors: bad policies, parameters and configuration
/// - Internal errors: serialization, task joins and generator failures
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// Whether this error only concerns a single file and should be absorbed
    /// by batch operations instead of aborting them
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Error::Io(IoError {
                path: Some(_),
                ..
            }) | Error::Internal(InternalError::Generation { .. })
        )
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::serialization(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(InternalError::task_join(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_file_not_found_error_creation() {
        let path = Path::new("/photos/missing.jpg");
        let error = Error::Io(IoError::file_not_found(path));

        match error {
            Error::Io(io_err) => {
                assert_eq!(io_err.kind, IoErrorKind::FileNotFound);
                assert_eq!(io_err.path, Some(path.to_path_buf()));
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();

        match error {
            Error::Io(io_err) => {
                assert_eq!(io_err.kind, IoErrorKind::FileNotFound);
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_from_serde_error() {
        let parse_error = serde_json::from_str::<u64>("not json").unwrap_err();
        let error: Error = parse_error.into();

        assert!(matches!(
            error,
            Error::Internal(InternalError::Serialization { .. })
        ));
        assert!(error.to_string().contains("Serialization failed"));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let error = Error::Validation(ValidationError::invalid_parameter(
            "concurrency",
            "must be at least 1",
        ));

        assert!(error.to_string().contains("concurrency"));
        assert!(error.to_string().contains("at least 1"));
    }

    #[test]
    fn test_per_file_classification() {
        let per_file = Error::Io(IoError::file_not_found(Path::new("/a.png")));
        assert!(per_file.is_per_file());

        let generation = Error::Internal(InternalError::generation(
            Path::new("/b.png"),
            "decoder rejected input",
        ));
        assert!(generation.is_per_file());

        let global = Error::Internal(InternalError::assertion("broken invariant"));
        assert!(!global.is_per_file());
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let path = Path::new("/cache/ab/abcd.thumb");
        let error = Error::Io(IoError::from_std(io_error).with_path(path));

        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
