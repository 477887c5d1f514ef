//! # Gofannon GitHub
//!
//! GitHub REST boundary for Gofannon. Everything the agent does to a
//! repository goes through the [`RepoHost`] trait defined here:
//!
//! - **Contents**: fetch and commit files on the work branch
//! - **Search**: code search scoped to the repository
//! - **Progress**: update the issue comment that tracks the run
//!
//! [`GithubClient`] is the production implementation; `MockRepoHost` (behind
//! the `testing` feature) backs the agent's tests with an in-memory map.

pub mod client;
pub mod error;
pub mod host;
pub mod progress;

pub use client::{GithubClient, GithubConfig};
pub use error::{GithubError, Result};
pub use host::{RemoteEntry, RemoteFile, RepoHost, SharedRepoHost};
pub use progress::render_progress_bar;

#[cfg(any(test, feature = "testing"))]
pub use host::MockRepoHost;
