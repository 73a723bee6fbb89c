//! Validation related error types

use thiserror::Error;

/// Rejected input on the service boundary
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid input parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// Unknown request on the service boundary
    #[error("Unsupported request: {request}")]
    UnsupportedRequest { request: String },
}

impl ValidationError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an unsupported request error
    pub fn unsupported_request(request: &str) -> Self {
        Self::UnsupportedRequest {
            request: request.to_string(),
        }
    }
}
