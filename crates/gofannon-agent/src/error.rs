//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM backend failure (after the fallback chain is exhausted).
    #[error("LLM error: {0}")]
    Llm(#[from] gofannon_llm::LlmError),

    /// Repository host failure.
    #[error("GitHub error: {0}")]
    Github(#[from] gofannon_github::GithubError),

    /// Tool execution failure.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Requested tool does not exist in the registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// JSON serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}
