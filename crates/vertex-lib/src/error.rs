//! Error taxonomy for the probe pipeline
//!
//! Every pipeline step maps its own failures into exactly one category so
//! the caller can report a single diagnostic and stop.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while probing a prediction endpoint
#[derive(Debug, Error)]
pub enum Error {
    /// Key file missing/malformed, bad scopes, or token exchange refused
    #[error("{0}")]
    Credential(String),

    /// Invalid project/region identifiers or API base URL
    #[error("{0}")]
    Initialization(String),

    /// Endpoint identifier did not resolve, or access to it was denied
    #[error("endpoint '{endpoint}' could not be resolved: {reason}")]
    EndpointNotFound { endpoint: String, reason: String },

    /// Remote-side prediction failure
    #[error("{category}: {message}")]
    Prediction { category: String, message: String },

    /// Input data does not have the expected 50x15 shape
    #[error("invalid input data: {0}")]
    InvalidInput(String),

    /// Anything not anticipated by the other variants
    #[error("{0}")]
    Unexpected(String),
}

/// Coarse category reported alongside every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    CredentialError,
    InitializationError,
    EndpointNotFoundError,
    PredictionError,
    UnexpectedError,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::CredentialError => "CredentialError",
            ErrorCategory::InitializationError => "InitializationError",
            ErrorCategory::EndpointNotFoundError => "EndpointNotFoundError",
            ErrorCategory::PredictionError => "PredictionError",
            ErrorCategory::UnexpectedError => "UnexpectedError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Credential(_) => ErrorCategory::CredentialError,
            Error::Initialization(_) => ErrorCategory::InitializationError,
            Error::EndpointNotFound { .. } => ErrorCategory::EndpointNotFoundError,
            Error::Prediction { .. } => ErrorCategory::PredictionError,
            Error::InvalidInput(_) | Error::Unexpected(_) => ErrorCategory::UnexpectedError,
        }
    }

    pub(crate) fn prediction(category: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Prediction {
            category: category.into(),
            message: message.into(),
        }
    }

    pub(crate) fn endpoint_not_found(endpoint: &str, reason: impl Into<String>) -> Self {
        Error::EndpointNotFound {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

/// Serializable summary of a failure for reports
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}
