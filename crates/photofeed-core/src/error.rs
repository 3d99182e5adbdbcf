//! Error types for the photo feed
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for photo feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the photo feed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A well-formed request could not be built from the inputs
    #[error("Request construction failed: {0}")]
    RequestConstruction(String),

    /// Transport or decoding failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Photo is not present in the local cache
    #[error("Photo not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store task is no longer running
    #[error("Photo store is closed")]
    StoreClosed,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a request construction error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestConstruction(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Errors reported by a [`Transport`](crate::traits::Transport) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or the connection failed
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request timed out
    #[error("request timed out")]
    Timeout,
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
