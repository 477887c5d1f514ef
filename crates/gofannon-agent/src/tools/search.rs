//! Repository search and file tree tools.

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};

/// Tool that searches file contents across the repository.
#[derive(Debug, Default)]
pub struct SearchFileContentsTool;

impl SearchFileContentsTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SearchFileContentsTool {
    fn name(&self) -> &str {
        "search_remote_file_contents"
    }

    fn description(&self) -> &str {
        "Search file contents across the repository. Returns the paths of \
         matching files; read them with get_remote_file_content."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The code search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let query = match args.required_str("query", "provide the code search query") {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };

        let paths = match ctx.host.search_code(&query).await {
            Ok(paths) => paths,
            Err(e) => return Ok(ToolOutput::error(format!("code search failed: {e}"))),
        };

        tracing::debug!(query = %query, hits = paths.len(), "Searched repository");
        let mut body = format!("{} files found for query: '{query}'", paths.len());
        for path in &paths {
            body.push_str("\n- ");
            body.push_str(path);
        }
        Ok(ToolOutput::text(body))
    }
}

/// Tool that lists the entries of a directory on the work branch.
#[derive(Debug, Default)]
pub struct GetFileTreeTool;

impl GetFileTreeTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for GetFileTreeTool {
    fn name(&self) -> &str {
        "get_file_tree_list"
    }

    fn description(&self) -> &str {
        "List the files under a directory on the work branch. Pass an empty \
         dir_path for the repository root."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "dir_path": {
                    "type": "string",
                    "description": "Directory to list, relative to the repository root (empty for the root)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let dir_path = args.optional_str("dir_path").unwrap_or("").to_string();

        let paths = match ctx.host.file_tree(&dir_path).await {
            Ok(paths) => paths,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to list '{dir_path}': {e}"
                )));
            }
        };

        if paths.is_empty() {
            return Ok(ToolOutput::text(format!(
                "no files found under '{dir_path}'"
            )));
        }
        let listing = paths
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::text(format!(
            "{} entries under '{dir_path}':\n{listing}",
            paths.len()
        )))
    }
}
