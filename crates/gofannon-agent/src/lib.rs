//! # Gofannon Agent
//!
//! The agent core: everything between "here is an issue" and "a change is
//! committed on the work branch".
//!
//! - [`tool`] — the [`Tool`] trait, [`ToolRegistry`], and parameter helpers
//! - [`tools`] — the built-in tool set (diff application, file replace,
//!   windowed reads, code search, web search, progress comments)
//! - [`mode`] — agent modes: each fixes a system prompt and tool subset
//! - [`orchestrator`] — the per-step control loop: model selection with
//!   fallback, tool-name correction, duplicate suppression, dispatch
//! - [`runner`] — the outer explore/commit loop with the retry ceiling

pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod runner;
pub mod tool;
pub mod tools;

pub use error::{AgentError, Result};
pub use mode::AgentMode;
pub use orchestrator::{AgentOrchestrator, PreviousCallRecord, RunState, StepReport};
pub use runner::{IssueRunner, RunSummary};
pub use tool::{ParamError, ParamExt, Tool, ToolContext, ToolOutput, ToolRegistry};
pub use tools::default_registry;

#[cfg(any(test, feature = "testing"))]
pub use tool::MockTool;
