//! DeepSeek Error Types
//!
//! Error handling for the DeepSeek client library.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for DeepSeek operations
#[derive(Debug, Error)]
pub enum DeepSeekError {
    /// The server answered with a non-success status
    #[error("{status} {body}")]
    Api { status: StatusCode, body: String },

    /// The server answered with a success status but no body
    #[error("empty response")]
    EmptyResponse,

    /// Transport failure (connect, TLS, body read)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request encoding or response decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the event stream failed part-way through
    #[error("Streaming error: {0}")]
    Stream(#[from] std::io::Error),

    /// Response headers did not arrive in time
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// The call was cancelled before a result was available
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration errors (invalid file, bad header value, missing key)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeepSeekError {
    /// HTTP status of an API failure, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DeepSeekError::Api { status, .. } => Some(*status),
            DeepSeekError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeepSeekError::Cancelled)
    }
}

/// Result type alias for DeepSeek operations
pub type Result<T> = std::result::Result<T, DeepSeekError>;
