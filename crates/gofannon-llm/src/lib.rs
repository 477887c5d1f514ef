//! LLM client abstraction for Gofannon.
//!
//! Provides provider-agnostic chat types, backends for the Anthropic and
//! OpenAI APIs, transient-error retry, and the model fallback chain the
//! agent walks when a backend fails unrecoverably.

pub mod anthropic;
pub mod backend;
pub mod error;
pub mod fallback;
pub mod openai;
pub mod types;

// Re-export core types
pub use error::{LlmError, Result, is_retryable};
pub use types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Message, Role, StopReason,
    ToolChoice, ToolDefinition, ToolResultBlock, ToolUseBlock, Usage,
};

// Re-export backend machinery
pub use backend::{LlmBackend, SharedBackend, with_retry};

// Re-export providers
pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};

// Re-export routing
pub use fallback::{ModelFallbackChain, ModelFamily, ModelRouter};

#[cfg(any(test, feature = "testing"))]
pub use backend::MockBackend;
