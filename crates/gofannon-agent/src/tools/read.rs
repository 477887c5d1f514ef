//! Remote file reader with line-number and keyword windowing.
//!
//! Large files are never dumped whole around a target line: when the file
//! exceeds [`WINDOW_THRESHOLD`] lines and a line number is given, only a
//! window of [`BUFFER`] lines on each side is returned. Keyword lookups
//! return every occurrence's window, overlapping windows merged, joined
//! with an ellipsis separator.

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};
use gofannon_github::RemoteEntry;

/// Lines of context on each side of a target line.
const BUFFER: usize = 50;

/// Files at or below this many lines are always returned whole.
const WINDOW_THRESHOLD: usize = 100;

/// Separator between non-contiguous keyword windows.
const SEGMENT_SEPARATOR: &str = "\n...\n";

/// Tool that reads one file (or lists one directory) from the work branch.
#[derive(Debug, Default)]
pub struct GetFileContentTool;

impl GetFileContentTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }

    /// Number `lines[start..end]` as `N: text` with 1-based line numbers.
    fn number_lines(lines: &[&str], start: usize, end: usize) -> String {
        lines[start..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}: {}", start + i + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Window the file around every line containing `keyword`.
    fn keyword_windows(lines: &[&str], keyword: &str) -> Option<String> {
        let hits: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(keyword))
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            return None;
        }

        // Merge overlapping windows before rendering.
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for hit in hits {
            let start = hit.saturating_sub(BUFFER);
            let end = (hit + BUFFER + 1).min(lines.len());
            match ranges.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => ranges.push((start, end)),
            }
        }

        Some(
            ranges
                .iter()
                .map(|&(start, end)| Self::number_lines(lines, start, end))
                .collect::<Vec<_>>()
                .join(SEGMENT_SEPARATOR),
        )
    }

    /// Window the file around a 1-based target line, or return it whole
    /// when it is small enough.
    fn line_window(lines: &[&str], line_number: usize) -> String {
        if lines.len() <= WINDOW_THRESHOLD {
            return Self::number_lines(lines, 0, lines.len());
        }
        let target = line_number.saturating_sub(1).min(lines.len() - 1);
        let start = target.saturating_sub(BUFFER);
        let end = (target + BUFFER + 1).min(lines.len());
        Self::number_lines(lines, start, end)
    }
}

#[async_trait]
impl Tool for GetFileContentTool {
    fn name(&self) -> &str {
        "get_remote_file_content"
    }

    fn description(&self) -> &str {
        "Read a file from the work branch with line numbers. Pass line_number \
         to window a large file around one line, or keyword to see every \
         occurrence with surrounding context. A directory path lists its \
         entries."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file (or directory) to read, relative to the repository root"
                },
                "line_number": {
                    "type": "integer",
                    "description": "Center the view on this 1-based line (large files only)"
                },
                "keyword": {
                    "type": "string",
                    "description": "Show every line containing this keyword with surrounding context"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let file_path = match args.required_str("file_path", "provide the path of the file to read")
        {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };
        let line_number = args.optional_u64("line_number");
        let keyword = args.optional_str("keyword").map(String::from);

        if line_number.is_some() && keyword.is_some() {
            return Ok(ToolOutput::error(
                "pass either line_number or keyword, not both",
            ));
        }

        let content = match ctx.host.get_file(&file_path).await {
            Ok(RemoteEntry::File(f)) => f.content,
            Ok(RemoteEntry::Missing) => {
                return Ok(ToolOutput::error(format!(
                    "'{file_path}' does not exist on the work branch"
                )));
            }
            Ok(RemoteEntry::Directory(paths)) => {
                let listing = paths
                    .iter()
                    .map(|p| format!("- {p}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(ToolOutput::text(format!(
                    "'{file_path}' is a directory containing:\n{listing}"
                )));
            }
            Err(e) => return Ok(ToolOutput::error(format!("failed to read '{file_path}': {e}"))),
        };

        let lines: Vec<&str> = content.lines().collect();
        let body = if let Some(keyword) = keyword.as_deref() {
            match Self::keyword_windows(&lines, keyword) {
                Some(body) => body,
                None => {
                    return Ok(ToolOutput::error(format!(
                        "keyword '{keyword}' not found in '{file_path}'"
                    )));
                }
            }
        } else if let Some(line_number) = line_number {
            Self::line_window(&lines, line_number as usize)
        } else {
            Self::number_lines(&lines, 0, lines.len())
        };

        tracing::debug!(path = %file_path, lines = lines.len(), "Opened file");
        Ok(ToolOutput::text(format!(
            "Opened file '{file_path}' with line numbers for your information.\n\n```\n{body}\n```"
        )))
    }
}
