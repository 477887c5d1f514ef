//! Error types for the GitHub boundary crate.

use thiserror::Error;

/// Result type alias using the GitHub error type.
pub type Result<T> = std::result::Result<T, GithubError>;

/// Error type for GitHub operations.
#[derive(Debug, Error)]
pub enum GithubError {
    /// Network-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// GitHub returned a non-success status.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or message.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Client misconfiguration (missing token, empty branch).
    #[error("Configuration error: {0}")]
    Config(String),
}
