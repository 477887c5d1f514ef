//! Diff application engine for Gofannon.
//!
//! Takes original file text plus a unified diff and produces the new file
//! text by driving `patch(1)` over temporary files. Handles the cases an
//! LLM-produced diff runs into in practice: stale context (fuzz), diffs
//! that were already applied, partial application with rejected hunks,
//! file creation from `/dev/null`, and mixed line endings.
//!
//! The engine never returns an `Err` and never panics past its boundary;
//! every failure mode is folded into a [`PatchOutcome`] variant.

pub mod apply;
pub mod line_break;

pub use apply::{PatchOutcome, apply};
pub use line_break::LineBreak;
