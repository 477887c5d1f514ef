//! Tool framework for agent capabilities.
//!
//! This module defines the [`Tool`] trait that all agent tools implement,
//! the [`ToolContext`] handed to them, and the [`ToolRegistry`] that maps
//! tool names to implementations and produces per-mode subsets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use gofannon_github::SharedRepoHost;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for tool parameter extraction failures.
///
/// Messages are written for the model's benefit: they name the parameter
/// and say how to fix the call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParamError {
    /// A required parameter is missing.
    #[error("missing required parameter '{name}': {hint}")]
    Missing {
        /// The parameter name.
        name: &'static str,
        /// Hint for the model on how to fix the call.
        hint: &'static str,
    },

    /// A parameter value is unusable.
    #[error("invalid value for '{name}': {message}")]
    Invalid {
        /// The parameter name.
        name: &'static str,
        /// Why the value is unusable.
        message: String,
    },
}

impl ParamError {
    /// Create a missing required parameter error.
    pub fn missing(name: &'static str, hint: &'static str) -> Self {
        Self::Missing { name, hint }
    }

    /// Create an invalid value error.
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            message: message.into(),
        }
    }
}

/// Result type for parameter extraction.
pub type ParamResult<T> = std::result::Result<T, ParamError>;

/// Helper trait for extracting tool parameters from JSON arguments.
pub trait ParamExt {
    /// Get a required string parameter.
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str>;

    /// Get an optional string parameter.
    fn optional_str(&self, name: &str) -> Option<&str>;

    /// Get an optional unsigned integer parameter.
    fn optional_u64(&self, name: &str) -> Option<u64>;

    /// Get an optional boolean parameter with a default.
    fn optional_bool(&self, name: &str, default: bool) -> bool;
}

impl ParamExt for serde_json::Value {
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str> {
        let value = self
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParamError::missing(name, hint))?;
        if value.trim().is_empty() {
            return Err(ParamError::invalid(name, "value cannot be empty"));
        }
        Ok(value)
    }

    fn optional_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    fn optional_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.as_u64())
    }

    fn optional_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
///
/// Carries the repository scope the run was started with plus the host
/// boundary. The model never supplies any of these fields.
#[derive(Clone)]
pub struct ToolContext {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch the work branch was forked from.
    pub base_branch: String,
    /// Branch all reads and writes target.
    pub work_branch: String,
    /// Whether commit messages should carry a `[skip ci]` marker.
    pub skip_ci: bool,
    /// Boundary to the repository host.
    pub host: SharedRepoHost,
}

impl ToolContext {
    /// Create a context for one run's repository scope.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        base_branch: impl Into<String>,
        work_branch: impl Into<String>,
        host: SharedRepoHost,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            base_branch: base_branch.into(),
            work_branch: work_branch.into(),
            skip_ci: false,
            host,
        }
    }

    /// Mark commits from this run with `[skip ci]`.
    pub fn with_skip_ci(mut self, skip_ci: bool) -> Self {
        self.skip_ci = skip_ci;
        self
    }

    /// Build the commit message for a file write.
    pub fn commit_message(&self, path: &str) -> String {
        if self.skip_ci {
            format!("Update {path} [skip ci]")
        } else {
            format!("Update {path}")
        }
    }

    /// Build the commit message for a file deletion.
    pub fn delete_message(&self, path: &str) -> String {
        if self.skip_ci {
            format!("Delete {path} [skip ci]")
        } else {
            format!("Delete {path}")
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("base_branch", &self.base_branch)
            .field("work_branch", &self.work_branch)
            .field("skip_ci", &self.skip_ci)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Output
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a tool execution, as fed back to the model.
///
/// Tools fold every failure into [`ToolOutput::Error`] text rather than
/// raising; the orchestration loop keeps going either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    /// Successful text output.
    Text {
        /// The text content.
        content: String,
    },
    /// Tool execution failed; the model is expected to self-correct.
    Error {
        /// Error message.
        message: String,
    },
}

impl ToolOutput {
    /// Create a text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create an error output.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Check if this output is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Get the content as text for the model.
    pub fn to_model_text(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::Error { message } => format!("Error: {message}"),
        }
    }
}

impl From<ParamError> for ToolOutput {
    fn from(err: ParamError) -> Self {
        ToolOutput::error(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for agent tools.
///
/// Each tool declares its parameters as a JSON Schema and implements
/// async execution against the run's [`ToolContext`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get a human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for this tool's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// Implementations convert their own failures into [`ToolOutput::Error`];
    /// a returned `Err` is reserved for infrastructure faults the loop
    /// cannot fold back into the conversation.
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry for managing available tools.
///
/// Maps tool names to implementations. Each agent mode exposes a subset
/// of the registry to the model via [`ToolRegistry::filtered_by_names`].
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Convert all tools to LLM tool definitions.
    pub fn to_llm_definitions(&self) -> Vec<gofannon_llm::ToolDefinition> {
        self.tools
            .values()
            .map(|tool| {
                gofannon_llm::ToolDefinition::new(
                    tool.name(),
                    tool.description(),
                    tool.parameters(),
                )
            })
            .collect()
    }

    /// Create a new registry containing only tools whose names are in the
    /// allowlist.
    ///
    /// Names not matching any registered tool are silently ignored.
    pub fn filtered_by_names(&self, names: &[&str]) -> ToolRegistry {
        let tools: HashMap<String, Arc<dyn Tool>> = names
            .iter()
            .filter_map(|&name| {
                self.tools
                    .get(name)
                    .map(|tool| (name.to_string(), Arc::clone(tool)))
            })
            .collect();
        ToolRegistry { tools }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Tool (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A mock tool for testing.
///
/// Returns configurable outputs and tracks calls for verification.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct MockTool {
    name: String,
    description: String,
    parameters: serde_json::Value,
    output: std::sync::Mutex<Option<ToolOutput>>,
    calls: std::sync::Mutex<Vec<serde_json::Value>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockTool {
    /// Create a new mock tool.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "A mock tool for testing".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            output: std::sync::Mutex::new(None),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Set the output to return.
    pub fn with_output(self, output: ToolOutput) -> Self {
        *self.output.lock().unwrap() = Some(output);
        self
    }

    /// Get the calls that were made to this tool.
    pub fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        self.parameters.clone()
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(args);
        Ok(self
            .output
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| ToolOutput::text("mock output")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
