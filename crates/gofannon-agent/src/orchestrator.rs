//! The agent orchestration loop.
//!
//! One [`AgentOrchestrator`] owns one run's conversation: it asks the
//! current model for the next action, corrects near-miss tool names,
//! suppresses exact-duplicate calls, dispatches the tool, folds the
//! result back into the history, and tracks token usage and progress.
//! Backend failures advance the model fallback chain; only an exhausted
//! chain propagates an error to the caller.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::mode::AgentMode;
use crate::tool::{ToolContext, ToolRegistry};
use gofannon_github::render_progress_bar;
use gofannon_llm::{
    CompletionRequest, CompletionResponse, Message, ModelFallbackChain, ModelRouter,
    ToolResultBlock,
};

/// Maximum same-mode continuations after a context-fetching tool call.
const MAX_RECURSION_DEPTH: u32 = 3;

/// Progress bar increment per productive step.
const PROGRESS_INCREMENT: u32 = 5;

/// Completion token budget per model call.
const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Tools whose results justify letting the model act again immediately.
const CONTINUATION_TOOLS: [&str; 2] = ["get_remote_file_content", "search_remote_file_contents"];

// ─────────────────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────────────────

/// A tool call the run has already made.
///
/// Records the *requested* name and arguments, before any name
/// correction, so a model repeating the same mistake is still caught.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousCallRecord {
    /// Requested function name.
    pub function: String,
    /// Requested arguments.
    pub arguments: serde_json::Value,
}

/// Mutable counters for one orchestration run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunState {
    /// Consecutive unproductive rounds seen by the caller.
    pub retry_count: u32,
    /// Same-mode continuation depth within the current step.
    pub recursion_depth: u32,
    /// Progress bar percentage, monotone and clamped at 100.
    pub progress_percent: u32,
    /// Prompt tokens consumed across the run.
    pub token_input_total: u64,
    /// Completion tokens generated across the run.
    pub token_output_total: u64,
}

/// What one orchestration step did.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Name of the tool that ran (after correction), if any.
    pub tool_name: Option<String>,
    /// Arguments the tool ran with, if any.
    pub tool_args: Option<serde_json::Value>,
    /// Prompt tokens for the step's final model call.
    pub token_input: u32,
    /// Completion tokens for the step's final model call.
    pub token_output: u32,
    /// Whether a productive, novel tool call was executed.
    pub is_done: bool,
    /// Progress percentage after the step.
    pub progress_percent: u32,
}

impl StepReport {
    fn unproductive(token_input: u32, token_output: u32, progress_percent: u32) -> Self {
        Self {
            tool_name: None,
            tool_args: None,
            token_input,
            token_output,
            is_done: false,
            progress_percent,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the model/tool conversation for one run.
pub struct AgentOrchestrator {
    router: ModelRouter,
    chain: ModelFallbackChain,
    registry: ToolRegistry,
    ctx: ToolContext,
    messages: Vec<Message>,
    previous_calls: Vec<PreviousCallRecord>,
    state: RunState,
    progress_log: Vec<String>,
}

impl AgentOrchestrator {
    /// Create an orchestrator for one run.
    ///
    /// `task` is the issue text the model works from; it becomes the
    /// opening user message.
    pub fn new(
        router: ModelRouter,
        chain: ModelFallbackChain,
        registry: ToolRegistry,
        ctx: ToolContext,
        task: impl Into<String>,
    ) -> Self {
        Self {
            router,
            chain,
            registry,
            ctx,
            messages: vec![Message::user(task)],
            previous_calls: Vec::new(),
            state: RunState::default(),
            progress_log: Vec::new(),
        }
    }

    /// The run's counters.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// The append-only duplicate-detection log.
    pub fn previous_calls(&self) -> &[PreviousCallRecord] {
        &self.previous_calls
    }

    /// The conversation so far.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Run one orchestration step in the given mode.
    ///
    /// A step is one model turn plus up to [`MAX_RECURSION_DEPTH`]
    /// same-mode continuations when the executed tool fetched fresh
    /// context the model should act on immediately.
    pub async fn step(&mut self, mode: AgentMode) -> Result<StepReport> {
        self.state.recursion_depth = 0;
        let mut report = self.turn(mode).await?;

        while report.is_done
            && self.state.recursion_depth < MAX_RECURSION_DEPTH
            && report
                .tool_name
                .as_deref()
                .is_some_and(|name| CONTINUATION_TOOLS.contains(&name))
        {
            self.state.recursion_depth += 1;
            tracing::debug!(
                %mode,
                depth = self.state.recursion_depth,
                "Continuing in the same mode on fresh context"
            );
            let next = self.turn(mode).await?;
            if !next.is_done {
                break;
            }
            report = next;
        }

        Ok(report)
    }

    /// One model call plus at most one tool dispatch.
    async fn turn(&mut self, mode: AgentMode) -> Result<StepReport> {
        let subset = self.registry.filtered_by_names(mode.tool_names());
        let response = self.complete_with_fallback(mode, &subset).await?;

        let token_input = response.usage.input_tokens;
        let token_output = response.usage.output_tokens;
        self.state.token_input_total += u64::from(token_input);
        self.state.token_output_total += u64::from(token_output);

        let Some(tool_use) = response.first_tool_use() else {
            let text = response.text();
            if !text.is_empty() {
                self.messages.push(Message::assistant(text));
            }
            tracing::info!(%mode, "No tool call this turn");
            return Ok(StepReport::unproductive(
                token_input,
                token_output,
                self.state.progress_percent,
            ));
        };

        self.messages
            .push(Message::assistant_blocks(response.content.clone()));

        let requested_name = tool_use.name.clone();
        let requested_args = tool_use.input.clone();
        let resolved_name = Self::resolve_tool_name(&requested_name, &requested_args, &subset);

        if !subset.contains(&resolved_name) {
            tracing::warn!(%mode, tool = %requested_name, "Unknown tool requested");
            self.messages
                .push(Message::tool_result(ToolResultBlock::error(
                    &tool_use.id,
                    format!(
                        "the function '{requested_name}' does not exist in the available tools"
                    ),
                )));
            return Ok(StepReport::unproductive(
                token_input,
                token_output,
                self.state.progress_percent,
            ));
        }

        if self
            .previous_calls
            .iter()
            .any(|r| r.function == requested_name && r.arguments == requested_args)
        {
            tracing::info!(%mode, tool = %requested_name, "Duplicate tool call suppressed");
            self.messages
                .push(Message::tool_result(ToolResultBlock::error(
                    &tool_use.id,
                    format!(
                        "'{requested_name}' was already called with identical arguments; \
                         choose a different action"
                    ),
                )));
            return Ok(StepReport::unproductive(
                token_input,
                token_output,
                self.state.progress_percent,
            ));
        }
        self.previous_calls.push(PreviousCallRecord {
            function: requested_name.clone(),
            arguments: requested_args.clone(),
        });

        let tool = subset
            .get(&resolved_name)
            .ok_or_else(|| AgentError::ToolNotFound(resolved_name.clone()))?;
        tracing::info!(%mode, tool = %resolved_name, "Dispatching tool");
        let output = tool.execute(requested_args.clone(), &self.ctx).await?;

        let result = if output.is_error() {
            ToolResultBlock::error(&tool_use.id, output.to_model_text())
        } else {
            ToolResultBlock::success(&tool_use.id, output.to_model_text())
        };
        self.messages.push(Message::tool_result(result));

        self.record_progress(&resolved_name, &requested_args).await;

        Ok(StepReport {
            tool_name: Some(resolved_name),
            tool_args: Some(requested_args),
            token_input,
            token_output,
            is_done: true,
            progress_percent: self.state.progress_percent,
        })
    }

    /// Call the current model, advancing the fallback chain on failure.
    async fn complete_with_fallback(
        &mut self,
        mode: AgentMode,
        subset: &ToolRegistry,
    ) -> Result<CompletionResponse> {
        let definitions = subset.to_llm_definitions();
        loop {
            // complete_current fills in the model from the chain cursor.
            let request =
                CompletionRequest::new("", self.messages.clone(), MAX_COMPLETION_TOKENS)
                    .with_system(mode.system_prompt())
                    .with_tools(definitions.clone());

            match self.router.complete_current(&self.chain, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if self.chain.advance() {
                        tracing::warn!(error = %e, "Backend call failed, trying next model");
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Correct a near-miss tool name against the active subset.
    ///
    /// Argument shape wins over the requested name: diff-shaped arguments
    /// always mean the diff tool, full-content arguments the replace
    /// tool. Known lexical aliases of the replace tool map onto it.
    fn resolve_tool_name(
        requested: &str,
        args: &serde_json::Value,
        subset: &ToolRegistry,
    ) -> String {
        let has_diff = args.get("diff").is_some();
        let has_content = args.get("file_content").is_some();

        if requested == "replace_remote_file_content"
            && has_diff
            && !has_content
            && subset.contains("apply_diff_to_file")
        {
            return "apply_diff_to_file".to_string();
        }
        if requested == "apply_diff_to_file"
            && has_content
            && !has_diff
            && subset.contains("replace_remote_file_content")
        {
            return "replace_remote_file_content".to_string();
        }
        if matches!(
            requested,
            "create_remote_file" | "update_remote_file" | "modify_remote_file"
        ) && subset.contains("replace_remote_file_content")
        {
            return "replace_remote_file_content".to_string();
        }
        requested.to_string()
    }

    /// Log a human-readable line for the step and push the progress bar.
    async fn record_progress(&mut self, tool_name: &str, args: &serde_json::Value) {
        let line = match tool_name {
            "get_remote_file_content" => args
                .get("file_path")
                .and_then(|v| v.as_str())
                .map(|p| format!("Read `{p}`.")),
            "search_remote_file_contents" => args
                .get("query")
                .and_then(|v| v.as_str())
                .map(|q| format!("Searched the repository for `{q}`.")),
            "get_file_tree_list" => {
                let dir = args.get("dir_path").and_then(|v| v.as_str()).unwrap_or("");
                Some(if dir.is_empty() {
                    "Listed the repository root.".to_string()
                } else {
                    format!("Listed files under `{dir}`.")
                })
            }
            "search_web" => args
                .get("query")
                .and_then(|v| v.as_str())
                .map(|q| format!("Searched the web for `{q}`.")),
            "apply_diff_to_file" => args
                .get("file_path")
                .and_then(|v| v.as_str())
                .map(|p| format!("Committed a diff to `{p}`.")),
            "replace_remote_file_content" => args
                .get("file_path")
                .and_then(|v| v.as_str())
                .map(|p| format!("Rewrote `{p}`.")),
            _ => None,
        };
        let Some(line) = line else { return };

        self.progress_log.push(line);
        self.state.progress_percent =
            (self.state.progress_percent + PROGRESS_INCREMENT).min(100);
        let body = render_progress_bar(self.state.progress_percent, &self.progress_log.join("\n"));

        // Progress reporting is best-effort; a failed update never stops the run.
        if let Err(e) = self.ctx.host.update_comment(&body).await {
            tracing::warn!(error = %e, "Failed to update the progress comment");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{MockTool, Tool};
    use gofannon_github::MockRepoHost;
    use gofannon_llm::{
        CompletionResponse, ContentBlock, LlmError, MockBackend, StopReason, Usage,
    };
    use std::sync::Arc;

    fn tool_use_response(id: &str, name: &str, args: serde_json::Value) -> CompletionResponse {
        CompletionResponse::new(
            format!("msg_{id}"),
            "mock-model",
            vec![ContentBlock::tool_use(id, name, args)],
            StopReason::ToolUse,
            Usage::new(100, 20),
        )
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse::new(
            "msg_text",
            "mock-model",
            vec![ContentBlock::text(text)],
            StopReason::EndTurn,
            Usage::new(50, 10),
        )
    }

    struct Harness {
        orchestrator: AgentOrchestrator,
        host: Arc<MockRepoHost>,
        anthropic: Arc<MockBackend>,
    }

    fn harness_with(
        results: Vec<gofannon_llm::Result<CompletionResponse>>,
        tools: Vec<Arc<MockTool>>,
        models: Vec<&str>,
    ) -> Harness {
        let anthropic = Arc::new(MockBackend::new(results));
        let openai = Arc::new(MockBackend::new(vec![]));
        let router = ModelRouter::new(anthropic.clone(), openai);
        let chain = ModelFallbackChain::new(models.iter().map(|s| s.to_string()).collect());

        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register_arc(tool as Arc<dyn Tool>);
        }

        let host = Arc::new(MockRepoHost::new());
        let ctx = ToolContext::new("octo", "hello", "main", "gofannon/issue-1", host.clone());
        let orchestrator =
            AgentOrchestrator::new(router, chain, registry, ctx, "Fix the bug in notes.txt");
        Harness {
            orchestrator,
            host,
            anthropic,
        }
    }

    #[tokio::test]
    async fn test_productive_tool_call() {
        let tool = Arc::new(MockTool::new("get_remote_file_content"));
        let mut h = harness_with(
            vec![
                Ok(tool_use_response(
                    "t1",
                    "get_remote_file_content",
                    serde_json::json!({"file_path": "notes.txt"}),
                )),
                Ok(text_response("I have enough context.")),
            ],
            vec![tool.clone()],
            vec!["claude-sonnet-4"],
        );

        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(report.is_done);
        assert_eq!(report.tool_name.as_deref(), Some("get_remote_file_content"));
        assert_eq!(tool.call_count(), 1);
        assert_eq!(h.orchestrator.previous_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_call_is_suppressed() {
        let args = serde_json::json!({"file_path": "notes.txt"});
        let tool = Arc::new(MockTool::new("get_remote_file_content"));
        let mut h = harness_with(
            vec![
                Ok(tool_use_response("t1", "get_remote_file_content", args.clone())),
                Ok(tool_use_response("t2", "get_remote_file_content", args.clone())),
            ],
            vec![tool.clone()],
            vec!["claude-sonnet-4"],
        );

        // First step executes the tool, the continuation repeats the call
        // and is suppressed.
        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(report.is_done);
        assert_eq!(tool.call_count(), 1);
        assert_eq!(h.orchestrator.previous_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_no_tool_call_turn_is_not_done() {
        let mut h = harness_with(
            vec![Ok(text_response("Nothing to do."))],
            vec![],
            vec!["claude-sonnet-4"],
        );

        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(!report.is_done);
        assert!(report.tool_name.is_none());
    }

    #[tokio::test]
    async fn test_model_fallback_advances_chain() {
        let tool = Arc::new(MockTool::new("get_remote_file_content"));
        let mut h = harness_with(
            vec![
                Err(LlmError::Api("first model down".into())),
                Ok(tool_use_response(
                    "t1",
                    "get_remote_file_content",
                    serde_json::json!({"file_path": "a.txt"}),
                )),
                Ok(text_response("done")),
            ],
            vec![tool],
            vec!["claude-a", "claude-b"],
        );

        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(report.is_done);

        let requests = h.anthropic.requests();
        assert_eq!(requests[0].model, "claude-a");
        assert_eq!(requests[1].model, "claude-b");
    }

    #[tokio::test]
    async fn test_exhausted_chain_propagates_error() {
        let mut h = harness_with(
            vec![Err(LlmError::Api("down".into()))],
            vec![],
            vec!["claude-only"],
        );

        let result = h.orchestrator.step(AgentMode::Explore).await;
        assert!(matches!(result, Err(AgentError::Llm(_))));
    }

    #[tokio::test]
    async fn test_name_correction_by_argument_shape() {
        let apply = Arc::new(MockTool::new("apply_diff_to_file"));
        let replace = Arc::new(MockTool::new("replace_remote_file_content"));
        let mut h = harness_with(
            vec![Ok(tool_use_response(
                "t1",
                "replace_remote_file_content",
                serde_json::json!({"file_path": "a.txt", "diff": "--- a\n+++ b\n"}),
            ))],
            vec![apply.clone(), replace.clone()],
            vec!["claude-sonnet-4"],
        );

        let report = h.orchestrator.step(AgentMode::Commit).await.unwrap();
        assert!(report.is_done);
        assert_eq!(report.tool_name.as_deref(), Some("apply_diff_to_file"));
        assert_eq!(apply.call_count(), 1);
        assert_eq!(replace.call_count(), 0);
        // Duplicate detection records the name as requested.
        assert_eq!(
            h.orchestrator.previous_calls()[0].function,
            "replace_remote_file_content"
        );
    }

    #[tokio::test]
    async fn test_name_correction_by_lexical_alias() {
        let replace = Arc::new(MockTool::new("replace_remote_file_content"));
        let apply = Arc::new(MockTool::new("apply_diff_to_file"));
        let mut h = harness_with(
            vec![Ok(tool_use_response(
                "t1",
                "create_remote_file",
                serde_json::json!({"file_path": "new.txt", "file_content": "hi\n"}),
            ))],
            vec![replace.clone(), apply],
            vec!["claude-sonnet-4"],
        );

        let report = h.orchestrator.step(AgentMode::Commit).await.unwrap();
        assert!(report.is_done);
        assert_eq!(
            report.tool_name.as_deref(),
            Some("replace_remote_file_content")
        );
        assert_eq!(replace.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_folds_into_conversation() {
        let mut h = harness_with(
            vec![Ok(tool_use_response(
                "t1",
                "bogus_tool",
                serde_json::json!({}),
            ))],
            vec![],
            vec!["claude-sonnet-4"],
        );

        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(!report.is_done);

        let last = h.orchestrator.messages().last().unwrap();
        let json = serde_json::to_string(last).unwrap();
        assert!(json.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_recursion_capped_at_three_continuations() {
        // Five distinct read requests queued; only 1 + 3 continuations run.
        let tool = Arc::new(MockTool::new("get_remote_file_content"));
        let results = (0..5)
            .map(|i| {
                Ok(tool_use_response(
                    &format!("t{i}"),
                    "get_remote_file_content",
                    serde_json::json!({"file_path": format!("file{i}.txt")}),
                ))
            })
            .collect();
        let mut h = harness_with(results, vec![tool.clone()], vec!["claude-sonnet-4"]);

        let report = h.orchestrator.step(AgentMode::Explore).await.unwrap();
        assert!(report.is_done);
        assert_eq!(h.anthropic.request_count(), 4);
        assert_eq!(tool.call_count(), 4);
    }

    #[tokio::test]
    async fn test_progress_is_monotone_and_clamped() {
        let tool = Arc::new(MockTool::new("search_web"));
        let results = (0..2)
            .map(|i| {
                Ok(tool_use_response(
                    &format!("t{i}"),
                    "search_web",
                    serde_json::json!({"query": format!("query {i}")}),
                ))
            })
            .collect();
        let mut h = harness_with(results, vec![tool], vec!["claude-sonnet-4"]);

        let first = h.orchestrator.step(AgentMode::Search).await.unwrap();
        let second = h.orchestrator.step(AgentMode::Search).await.unwrap();
        assert_eq!(first.progress_percent, 5);
        assert_eq!(second.progress_percent, 10);

        let comments = h.host.comments();
        assert_eq!(comments.len(), 2);
        assert!(comments[0].contains("5%"));
        assert!(comments[1].contains("10%"));
        assert!(comments[1].contains("query 0"));
        assert!(comments[1].contains("query 1"));
    }
}
