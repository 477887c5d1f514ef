//! The `RepoHost` trait - the call boundary to the repository host.
//!
//! Tools talk to the repository exclusively through this trait, so the
//! agent core can be exercised against an in-memory mock.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// A file fetched from the repository host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded file content.
    pub content: String,
    /// Blob SHA, required for updates.
    pub sha: String,
}

/// What a contents lookup resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    /// The path does not exist on the branch.
    Missing,
    /// A single file.
    File(RemoteFile),
    /// A directory; carries the paths it contains.
    Directory(Vec<String>),
}

/// Async boundary to the repository host (GitHub in production).
///
/// All methods are scoped to the owner/repo/branch the implementation was
/// constructed with; the model never supplies those.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Look up a path on the work branch.
    async fn get_file(&self, path: &str) -> Result<RemoteEntry>;

    /// Create or update a file on the work branch.
    ///
    /// `sha` must be the current blob SHA when updating an existing file
    /// and empty when creating a new one.
    async fn put_file(&self, path: &str, content: &str, sha: &str, message: &str) -> Result<()>;

    /// Delete a file from the work branch.
    ///
    /// `sha` must be the current blob SHA of the file.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<()>;

    /// Search file contents in the repository; returns matching paths.
    async fn search_code(&self, query: &str) -> Result<Vec<String>>;

    /// List the entries of a directory (repo root for an empty path).
    async fn file_tree(&self, dir_path: &str) -> Result<Vec<String>>;

    /// Replace the body of the run's progress comment.
    async fn update_comment(&self, body: &str) -> Result<()>;
}

/// A host that can be shared across tools.
pub type SharedRepoHost = Arc<dyn RepoHost>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Host
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory repository host for testing.
///
/// Holds a path → file map and records every write and comment update.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct MockRepoHost {
    files: std::sync::Mutex<std::collections::HashMap<String, RemoteFile>>,
    search_results: std::sync::Mutex<std::collections::HashMap<String, Vec<String>>>,
    puts: std::sync::Mutex<Vec<(String, String, String)>>,
    deletes: std::sync::Mutex<Vec<(String, String)>>,
    comments: std::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockRepoHost {
    /// Create an empty mock host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file at `path`.
    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let sha = format!("sha-{path}");
        self.files.lock().unwrap().insert(
            path,
            RemoteFile {
                content: content.into(),
                sha,
            },
        );
        self
    }

    /// Seed the paths returned for a search query.
    pub fn with_search_result(self, query: impl Into<String>, paths: Vec<String>) -> Self {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.into(), paths);
        self
    }

    /// All `(path, content, message)` triples written so far.
    pub fn puts(&self) -> Vec<(String, String, String)> {
        self.puts.lock().unwrap().clone()
    }

    /// All `(path, message)` pairs deleted so far.
    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }

    /// All comment bodies pushed so far.
    pub fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl RepoHost for MockRepoHost {
    async fn get_file(&self, path: &str) -> Result<RemoteEntry> {
        let files = self.files.lock().unwrap();
        if let Some(file) = files.get(path) {
            return Ok(RemoteEntry::File(file.clone()));
        }
        // A prefix match means the path is a directory.
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let contained: Vec<String> = files
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        if !contained.is_empty() {
            return Ok(RemoteEntry::Directory(contained));
        }
        Ok(RemoteEntry::Missing)
    }

    async fn put_file(&self, path: &str, content: &str, _sha: &str, message: &str) -> Result<()> {
        self.files.lock().unwrap().insert(
            path.to_string(),
            RemoteFile {
                content: content.to_string(),
                sha: format!("sha-{path}-updated"),
            },
        );
        self.puts.lock().unwrap().push((
            path.to_string(),
            content.to_string(),
            message.to_string(),
        ));
        Ok(())
    }

    async fn delete_file(&self, path: &str, _sha: &str, message: &str) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        self.deletes
            .lock()
            .unwrap()
            .push((path.to_string(), message.to_string()));
        Ok(())
    }

    async fn search_code(&self, query: &str) -> Result<Vec<String>> {
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn file_tree(&self, dir_path: &str) -> Result<Vec<String>> {
        let files = self.files.lock().unwrap();
        let prefix = if dir_path.is_empty() {
            String::new()
        } else {
            format!("{}/", dir_path.trim_end_matches('/'))
        };
        Ok(files
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn update_comment(&self, body: &str) -> Result<()> {
        self.comments.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_host_file_lookup() {
        let host = MockRepoHost::new().with_file("src/main.rs", "fn main() {}\n");

        match host.get_file("src/main.rs").await.unwrap() {
            RemoteEntry::File(f) => assert_eq!(f.content, "fn main() {}\n"),
            other => panic!("expected file, got {other:?}"),
        }
        assert_eq!(host.get_file("missing.rs").await.unwrap(), RemoteEntry::Missing);
    }

    #[tokio::test]
    async fn test_mock_host_directory_lookup() {
        let host = MockRepoHost::new()
            .with_file("src/main.rs", "")
            .with_file("src/lib.rs", "");

        match host.get_file("src").await.unwrap() {
            RemoteEntry::Directory(paths) => assert_eq!(paths.len(), 2),
            other => panic!("expected directory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_host_delete_removes_file() {
        let host = MockRepoHost::new().with_file("old.txt", "gone\n");
        host.delete_file("old.txt", "sha-old.txt", "Delete old.txt")
            .await
            .unwrap();

        assert_eq!(host.get_file("old.txt").await.unwrap(), RemoteEntry::Missing);
        assert_eq!(
            host.deletes(),
            vec![("old.txt".to_string(), "Delete old.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mock_host_records_puts_and_comments() {
        let host = MockRepoHost::new();
        host.put_file("a.txt", "hello", "", "Update a.txt").await.unwrap();
        host.update_comment("progress").await.unwrap();

        assert_eq!(host.puts().len(), 1);
        assert_eq!(host.puts()[0].0, "a.txt");
        assert_eq!(host.comments(), vec!["progress".to_string()]);
    }
}
