//! Whole-file replacement tool.

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};
use gofannon_github::RemoteEntry;

/// Tool that creates a file or replaces its entire content.
#[derive(Debug, Default)]
pub struct ReplaceFileTool;

impl ReplaceFileTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for ReplaceFileTool {
    fn name(&self) -> &str {
        "replace_remote_file_content"
    }

    fn description(&self) -> &str {
        "Create a file on the work branch or replace its entire content, then \
         commit. Use apply_diff_to_file instead for targeted edits to an \
         existing file."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to create or replace, relative to the repository root"
                },
                "file_content": {
                    "type": "string",
                    "description": "The complete new content of the file"
                }
            },
            "required": ["file_path", "file_content"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let file_path = match args.required_str("file_path", "provide the path of the file to write")
        {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };
        // Deliberately not required_str: an empty string is a valid file body.
        let Some(file_content) = args.optional_str("file_content") else {
            return Ok(ToolOutput::error(
                "missing required parameter 'file_content': provide the complete new file content",
            ));
        };

        let sha = match ctx.host.get_file(&file_path).await {
            Ok(RemoteEntry::File(f)) => f.sha,
            Ok(RemoteEntry::Missing) => String::new(),
            Ok(RemoteEntry::Directory(_)) => {
                return Ok(ToolOutput::error(format!(
                    "'{file_path}' is a directory, not a file"
                )));
            }
            Err(e) => return Ok(ToolOutput::error(format!("failed to read '{file_path}': {e}"))),
        };

        let created = sha.is_empty();
        if let Err(e) = ctx
            .host
            .put_file(&file_path, file_content, &sha, &ctx.commit_message(&file_path))
            .await
        {
            return Ok(ToolOutput::error(format!(
                "failed to commit '{file_path}': {e}"
            )));
        }

        tracing::info!(path = %file_path, created, "Replaced file content");
        Ok(ToolOutput::text(if created {
            format!("created '{file_path}' and committed it to the work branch")
        } else {
            format!("replaced the content of '{file_path}' and committed it to the work branch")
        }))
    }
}
