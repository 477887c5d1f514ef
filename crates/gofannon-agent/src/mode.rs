//! Agent modes.
//!
//! Each mode fixes the system instruction given to the model and the
//! subset of the tool registry it may call. The issue runner alternates
//! [`AgentMode::Explore`] and [`AgentMode::Commit`]; the narrower modes
//! back single-purpose entry points.

use serde::{Deserialize, Serialize};

/// The operating mode of one orchestration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Draft or update a human-facing comment.
    Comment,
    /// Mutate repository files and commit the result.
    Commit,
    /// Gather context: read files, search code, browse the tree.
    Explore,
    /// Retrieve a single file's content.
    Get,
    /// Search the repository and the web.
    Search,
}

impl AgentMode {
    /// The system instruction for this mode.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentMode::Comment => {
                "You update the progress comment on the issue so the requester \
                 can follow along. Keep it short and concrete. Use the \
                 update_progress_comment tool."
            }
            AgentMode::Commit => {
                "You resolve the issue by changing files on the work branch. \
                 Prefer apply_diff_to_file with a unified diff; use \
                 replace_remote_file_content only when rewriting a whole file \
                 is genuinely simpler. Never fabricate file contents you have \
                 not read. When no further change is needed, reply without \
                 calling a tool."
            }
            AgentMode::Explore => {
                "You gather the context needed to resolve the issue. Read the \
                 files it mentions, search for related code, and inspect the \
                 file tree. Call one tool at a time. When you have enough \
                 context, reply without calling a tool."
            }
            AgentMode::Get => {
                "You retrieve the content of one file from the repository \
                 using get_remote_file_content."
            }
            AgentMode::Search => {
                "You locate relevant information for the issue, searching the \
                 repository first and the web when the repository is not \
                 enough."
            }
        }
    }

    /// The tool names exposed to the model in this mode.
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            AgentMode::Comment => &["update_progress_comment"],
            AgentMode::Commit => &["apply_diff_to_file", "replace_remote_file_content"],
            AgentMode::Explore => &[
                "get_remote_file_content",
                "search_remote_file_contents",
                "get_file_tree_list",
                "search_web",
            ],
            AgentMode::Get => &["get_remote_file_content"],
            AgentMode::Search => &["search_remote_file_contents", "search_web"],
        }
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentMode::Comment => "comment",
            AgentMode::Commit => "commit",
            AgentMode::Explore => "explore",
            AgentMode::Get => "get",
            AgentMode::Search => "search",
        };
        write!(f, "{name}")
    }
}
