//! Progress comment tool.

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};

/// Tool that lets the model rewrite the run's progress comment.
#[derive(Debug, Default)]
pub struct UpdateProgressCommentTool;

impl UpdateProgressCommentTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for UpdateProgressCommentTool {
    fn name(&self) -> &str {
        "update_progress_comment"
    }

    fn description(&self) -> &str {
        "Replace the body of the issue comment that tracks this run. Use it \
         to tell the requester what is happening in plain language."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "body": {
                    "type": "string",
                    "description": "The complete new comment body (Markdown)"
                }
            },
            "required": ["body"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let body = match args.required_str("body", "provide the new comment body") {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };

        if let Err(e) = ctx.host.update_comment(&body).await {
            return Ok(ToolOutput::error(format!(
                "failed to update the progress comment: {e}"
            )));
        }
        Ok(ToolOutput::text("progress comment updated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gofannon_github::MockRepoHost;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_updates_comment() {
        let host = Arc::new(MockRepoHost::new());
        let ctx = ToolContext::new("octo", "hello", "main", "gofannon/issue-1", host.clone());
        let tool = UpdateProgressCommentTool::new();

        let output = tool
            .execute(serde_json::json!({"body": "Working on it."}), &ctx)
            .await
            .unwrap();
        assert!(!output.is_error());
        assert_eq!(host.comments(), vec!["Working on it.".to_string()]);
    }
}
