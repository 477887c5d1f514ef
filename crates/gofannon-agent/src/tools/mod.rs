//! Built-in agent tools.

pub mod comment;
pub mod diff;
pub mod read;
pub mod replace;
pub mod search;
pub mod web;

pub use comment::UpdateProgressCommentTool;
pub use diff::ApplyDiffTool;
pub use read::GetFileContentTool;
pub use replace::ReplaceFileTool;
pub use search::{GetFileTreeTool, SearchFileContentsTool};
pub use web::SearchWebTool;

use crate::error::Result;
use crate::tool::ToolRegistry;

/// Build a registry with the full built-in tool set.
pub fn default_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(ApplyDiffTool::new());
    registry.register(ReplaceFileTool::new());
    registry.register(GetFileContentTool::new());
    registry.register(SearchFileContentsTool::new());
    registry.register(GetFileTreeTool::new());
    registry.register(SearchWebTool::new()?);
    registry.register(UpdateProgressCommentTool::new());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::AgentMode;

    #[test]
    fn test_default_registry_covers_every_mode() {
        let registry = default_registry().unwrap();
        for mode in [
            AgentMode::Comment,
            AgentMode::Commit,
            AgentMode::Explore,
            AgentMode::Get,
            AgentMode::Search,
        ] {
            for name in mode.tool_names() {
                assert!(registry.contains(name), "missing tool {name} for {mode}");
            }
        }
    }
}
