//! Error types for the LLM crate.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure (connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider returned a rate-limit response.
    #[error("Rate limited: {0}")]
    RateLimit(String),

    /// Authentication failed (bad or missing API key).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Provider returned a non-success response.
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client misconfiguration (missing key, unknown model).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The fallback chain ran out of models.
    #[error("All models in the fallback chain failed; last error: {0}")]
    ModelsExhausted(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Whether an error is worth an in-place retry with backoff.
///
/// Only transient conditions qualify; auth and config errors would fail
/// identically on the next attempt.
pub fn is_retryable(error: &LlmError) -> bool {
    matches!(error, LlmError::Network(_) | LlmError::RateLimit(_))
}
