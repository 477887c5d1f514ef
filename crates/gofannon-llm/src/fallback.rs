//! Model fallback chain and backend routing.
//!
//! One orchestration run owns one [`ModelFallbackChain`]: an ordered list
//! of model identifiers with a cursor that only moves forward. The cursor
//! advances when a model's backend fails unrecoverably and never rewinds
//! within the run.

use crate::backend::SharedBackend;
use crate::error::{LlmError, Result};

/// Which provider family a model identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// OpenAI chat-completions models (`gpt-*`, `o1*`, `o3*`, `o4*`).
    OpenAi,
    /// Everything else routes to the Anthropic Messages API.
    Anthropic,
}

impl ModelFamily {
    /// Classify a model identifier. Pure routing, not a capability check.
    pub fn of(model_id: &str) -> Self {
        let id = model_id.to_ascii_lowercase();
        if id.starts_with("gpt-")
            || id.starts_with("o1")
            || id.starts_with("o3")
            || id.starts_with("o4")
        {
            ModelFamily::OpenAi
        } else {
            ModelFamily::Anthropic
        }
    }
}

/// An ordered list of model identifiers tried in sequence.
#[derive(Debug, Clone)]
pub struct ModelFallbackChain {
    models: Vec<String>,
    cursor: usize,
}

impl ModelFallbackChain {
    /// Create a chain from an ordered list of model identifiers.
    pub fn new(models: Vec<String>) -> Self {
        Self { models, cursor: 0 }
    }

    /// The model the cursor currently points at.
    pub fn current(&self) -> Option<&str> {
        self.models.get(self.cursor).map(|s| s.as_str())
    }

    /// Advance to the next model. Returns false when the chain is spent.
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.models.len() {
            self.cursor += 1;
            tracing::warn!(model = self.current().unwrap_or(""), "Falling back to next model");
            true
        } else {
            self.cursor = self.models.len();
            false
        }
    }

    /// Whether every model has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.models.len()
    }
}

/// Routes a model identifier to its provider backend.
pub struct ModelRouter {
    anthropic: SharedBackend,
    openai: SharedBackend,
}

impl ModelRouter {
    /// Create a router over the two provider backends.
    pub fn new(anthropic: SharedBackend, openai: SharedBackend) -> Self {
        Self { anthropic, openai }
    }

    /// Pick the backend for a model identifier.
    pub fn backend_for(&self, model_id: &str) -> &SharedBackend {
        match ModelFamily::of(model_id) {
            ModelFamily::OpenAi => &self.openai,
            ModelFamily::Anthropic => &self.anthropic,
        }
    }

    /// Route and complete against the chain's current model.
    pub async fn complete_current(
        &self,
        chain: &ModelFallbackChain,
        request: crate::types::CompletionRequest,
    ) -> Result<crate::types::CompletionResponse> {
        let model = chain
            .current()
            .ok_or_else(|| LlmError::Config("fallback chain is empty".to_string()))?;
        let mut request = request;
        request.model = model.to_string();
        let backend = self.backend_for(model);
        tracing::info!(model, backend = backend.name(), "Using model");
        backend.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_routing() {
        assert_eq!(ModelFamily::of("gpt-5"), ModelFamily::OpenAi);
        assert_eq!(ModelFamily::of("o3-mini"), ModelFamily::OpenAi);
        assert_eq!(ModelFamily::of("claude-sonnet-4"), ModelFamily::Anthropic);
        assert_eq!(ModelFamily::of("claude-opus-4"), ModelFamily::Anthropic);
    }

    #[test]
    fn test_chain_starts_at_first_model() {
        let chain = ModelFallbackChain::new(vec!["a".into(), "b".into()]);
        assert_eq!(chain.current(), Some("a"));
        assert!(!chain.is_exhausted());
    }

    #[test]
    fn test_chain_advances_then_exhausts() {
        let mut chain = ModelFallbackChain::new(vec!["a".into(), "b".into()]);
        assert!(chain.advance());
        assert_eq!(chain.current(), Some("b"));
        assert!(!chain.advance());
        assert!(chain.is_exhausted());
        assert_eq!(chain.current(), None);
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        let chain = ModelFallbackChain::new(vec![]);
        assert!(chain.is_exhausted());
        assert_eq!(chain.current(), None);
    }
}
