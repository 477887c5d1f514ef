//! The diff application tool.
//!
//! Reads the target file from the work branch, runs the patch engine in a
//! blocking task with a hard timeout, and commits whatever the engine
//! produced. Every engine outcome is folded into model-facing text.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};
use gofannon_github::RemoteEntry;
use gofannon_patch::{PatchOutcome, apply};

/// Hard ceiling on one patch process invocation.
const ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Tool that applies a unified diff to one remote file.
#[derive(Debug, Default)]
pub struct ApplyDiffTool;

impl ApplyDiffTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }

    /// Remove a file the diff targets with `+++ /dev/null`.
    async fn delete_file(&self, file_path: &str, ctx: &ToolContext) -> Result<ToolOutput> {
        let sha = match ctx.host.get_file(file_path).await {
            Ok(RemoteEntry::File(f)) => f.sha,
            Ok(RemoteEntry::Missing) => {
                return Ok(ToolOutput::text(format!(
                    "'{file_path}' does not exist on the work branch; nothing to delete"
                )));
            }
            Ok(RemoteEntry::Directory(_)) => {
                return Ok(ToolOutput::error(format!(
                    "'{file_path}' is a directory, not a file"
                )));
            }
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to read '{file_path}': {e}"
                )));
            }
        };

        tracing::info!(path = %file_path, "Deleting file");
        if let Err(e) = ctx
            .host
            .delete_file(file_path, &sha, &ctx.delete_message(file_path))
            .await
        {
            return Ok(ToolOutput::error(format!(
                "failed to delete '{file_path}': {e}"
            )));
        }
        Ok(ToolOutput::text(format!(
            "'{file_path}' deleted from the work branch"
        )))
    }

    /// Run the engine off the async runtime with a timeout.
    async fn run_engine(original: String, diff: String) -> PatchOutcome {
        let task = tokio::task::spawn_blocking(move || apply(&original, &diff));
        match tokio::time::timeout(ENGINE_TIMEOUT, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => PatchOutcome::Failed {
                message: format!("patch task failed: {join_err}"),
            },
            Err(_) => PatchOutcome::Failed {
                message: format!(
                    "patch process did not finish within {}s",
                    ENGINE_TIMEOUT.as_secs()
                ),
            },
        }
    }
}

#[async_trait]
impl Tool for ApplyDiffTool {
    fn name(&self) -> &str {
        "apply_diff_to_file"
    }

    fn description(&self) -> &str {
        "Apply a unified diff to a file on the work branch and commit the result. \
         Use this for targeted edits; the diff must match the file content you \
         have actually read. A diff against /dev/null deletes the file."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to modify, relative to the repository root"
                },
                "diff": {
                    "type": "string",
                    "description": "Unified diff to apply to the file"
                }
            },
            "required": ["file_path", "diff"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let file_path = match args.required_str("file_path", "provide the path of the file to modify") {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };
        let diff = match args.required_str("diff", "provide the unified diff to apply") {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };

        // A deletion diff removes the file outright; no patch run needed.
        if diff.contains("+++ /dev/null") {
            return self.delete_file(&file_path, ctx).await;
        }

        let (original, sha) = match ctx.host.get_file(&file_path).await {
            Ok(RemoteEntry::File(f)) => (f.content, f.sha),
            Ok(RemoteEntry::Missing) => (String::new(), String::new()),
            Ok(RemoteEntry::Directory(_)) => {
                return Ok(ToolOutput::error(format!(
                    "'{file_path}' is a directory, not a file"
                )));
            }
            Err(e) => return Ok(ToolOutput::error(format!("failed to read '{file_path}': {e}"))),
        };

        tracing::info!(path = %file_path, "Applying diff");
        let outcome = Self::run_engine(original, diff).await;

        match outcome {
            PatchOutcome::Applied { modified_text } => {
                if let Err(e) = ctx
                    .host
                    .put_file(&file_path, &modified_text, &sha, &ctx.commit_message(&file_path))
                    .await
                {
                    return Ok(ToolOutput::error(format!(
                        "diff applied but committing '{file_path}' failed: {e}"
                    )));
                }
                Ok(ToolOutput::text(format!(
                    "diff applied to '{file_path}' and committed to the work branch"
                )))
            }
            PatchOutcome::Emptied => {
                if let Err(e) = ctx
                    .host
                    .put_file(&file_path, "", &sha, &ctx.commit_message(&file_path))
                    .await
                {
                    return Ok(ToolOutput::error(format!(
                        "diff applied but committing '{file_path}' failed: {e}"
                    )));
                }
                Ok(ToolOutput::text(format!(
                    "diff applied to '{file_path}'; the file is now empty"
                )))
            }
            PatchOutcome::AlreadyApplied { message } => {
                // Benign: no changes needed, nothing committed.
                Ok(ToolOutput::text(format!(
                    "no changes needed for '{file_path}': {message}"
                )))
            }
            PatchOutcome::Partial {
                modified_text,
                reject_text,
                message,
            } => {
                if let Err(e) = ctx
                    .host
                    .put_file(&file_path, &modified_text, &sha, &ctx.commit_message(&file_path))
                    .await
                {
                    return Ok(ToolOutput::error(format!(
                        "partially applied diff could not be committed to '{file_path}': {e}"
                    )));
                }
                Ok(ToolOutput::error(format!(
                    "diff partially applied to '{file_path}'; the applied hunks were \
                     committed. Inspect the rejected hunks below, fix the diff against \
                     the current file content, and retry.\n\n{message}\n\nRejected hunks:\n{reject_text}"
                )))
            }
            PatchOutcome::Failed { message } => Ok(ToolOutput::error(format!(
                "diff could not be applied to '{file_path}': {message}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofannon_github::MockRepoHost;
    use std::sync::Arc;

    fn ctx_with(host: MockRepoHost) -> ToolContext {
        ToolContext::new("octo", "hello", "main", "gofannon/issue-1", Arc::new(host))
    }

    const MODIFY_DIFF: &str = "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,3 @@\n line 1\n-line 2\n+line 2 modified\n line 3\n";

    #[tokio::test]
    async fn test_applies_and_commits() {
        let host = MockRepoHost::new().with_file("notes.txt", "line 1\nline 2\nline 3\n");
        let ctx = ctx_with(host);
        let tool = ApplyDiffTool::new();

        let output = tool
            .execute(
                serde_json::json!({"file_path": "notes.txt", "diff": MODIFY_DIFF}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(!output.is_error(), "{output:?}");
        match ctx.host.get_file("notes.txt").await.unwrap() {
            RemoteEntry::File(f) => assert_eq!(f.content, "line 1\nline 2 modified\nline 3\n"),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deletion_diff_removes_file() {
        let host = MockRepoHost::new().with_file("old.txt", "gone\n");
        let ctx = ctx_with(host);
        let tool = ApplyDiffTool::new();

        let diff = "--- a/old.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-gone\n";
        let output = tool
            .execute(serde_json::json!({"file_path": "old.txt", "diff": diff}), &ctx)
            .await
            .unwrap();

        assert!(!output.is_error(), "{output:?}");
        assert_eq!(ctx.host.get_file("old.txt").await.unwrap(), RemoteEntry::Missing);
    }

    #[tokio::test]
    async fn test_deletion_diff_for_missing_file_is_benign() {
        let ctx = ctx_with(MockRepoHost::new());
        let tool = ApplyDiffTool::new();

        let diff = "--- a/old.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-gone\n";
        let output = tool
            .execute(serde_json::json!({"file_path": "old.txt", "diff": diff}), &ctx)
            .await
            .unwrap();

        assert!(!output.is_error(), "{output:?}");
        assert!(output.to_model_text().contains("nothing to delete"));
    }

    #[tokio::test]
    async fn test_already_applied_is_not_an_error() {
        let host = MockRepoHost::new().with_file("notes.txt", "line 1\nline 2 modified\nline 3\n");
        let ctx = ctx_with(host);
        let tool = ApplyDiffTool::new();

        let output = tool
            .execute(
                serde_json::json!({"file_path": "notes.txt", "diff": MODIFY_DIFF}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(!output.is_error(), "{output:?}");
        assert!(output.to_model_text().contains("no changes needed"));
    }

    #[tokio::test]
    async fn test_new_file_creation() {
        let ctx = ctx_with(MockRepoHost::new());
        let tool = ApplyDiffTool::new();

        let diff = "--- /dev/null\n+++ b/fresh.txt\n@@ -0,0 +1,2 @@\n+alpha\n+beta\n";
        let output = tool
            .execute(serde_json::json!({"file_path": "fresh.txt", "diff": diff}), &ctx)
            .await
            .unwrap();

        assert!(!output.is_error(), "{output:?}");
        match ctx.host.get_file("fresh.txt").await.unwrap() {
            RemoteEntry::File(f) => assert_eq!(f.content, "alpha\nbeta\n"),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_arguments_reported_to_model() {
        let ctx = ctx_with(MockRepoHost::new());
        let tool = ApplyDiffTool::new();

        let output = tool
            .execute(serde_json::json!({"file_path": "a.txt"}), &ctx)
            .await
            .unwrap();
        assert!(output.is_error());
        assert!(output.to_model_text().contains("diff"));
    }
}
