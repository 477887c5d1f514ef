//! GitHub REST implementation of [`RepoHost`].

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;

use crate::error::{GithubError, Result};
use crate::host::{RemoteEntry, RemoteFile, RepoHost};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the GitHub client.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Installation or personal access token.
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch all reads and writes target.
    pub branch: String,
    /// Issue comment id that carries the progress bar, if any.
    pub progress_comment_id: Option<u64>,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GithubConfig {
    /// Create a config for one owner/repo/branch scope.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            progress_comment_id: None,
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Attach the progress comment id.
    pub fn with_progress_comment(mut self, comment_id: u64) -> Self {
        self.progress_comment_id = Some(comment_id);
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// GitHub REST client scoped to one owner/repo/branch.
///
/// Constructed per orchestration run and dropped with it; there is no
/// process-global client state.
pub struct GithubClient {
    client: Client,
    config: GithubConfig,
}

impl GithubClient {
    /// Create a client with the given configuration.
    pub fn new(config: GithubConfig) -> Result<Self> {
        if config.branch.is_empty() {
            return Err(GithubError::Config("branch is not set".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("gofannon")
            .build()?;
        Ok(Self { client, config })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.base_url, self.config.owner, self.config.repo, path
        )
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.token),
            )
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn error_for(response: reqwest::Response) -> GithubError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        GithubError::Api { status, message }
    }

    fn decode_content(encoded: &str) -> Result<String> {
        // GitHub wraps base64 payloads at 60 columns.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| GithubError::Decode(format!("invalid base64 content: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn get_file(&self, path: &str) -> Result<RemoteEntry> {
        let response = self
            .add_headers(self.client.get(self.contents_url(path)))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RemoteEntry::Missing);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GithubError::Decode(e.to_string()))?;

        // A directory listing comes back as an array.
        if let Some(entries) = body.as_array() {
            let paths = entries
                .iter()
                .filter_map(|e| e.get("path").and_then(|p| p.as_str()))
                .map(String::from)
                .collect();
            return Ok(RemoteEntry::Directory(paths));
        }

        if body.get("type").and_then(|t| t.as_str()) == Some("dir") {
            return Ok(RemoteEntry::Directory(Vec::new()));
        }

        let encoded = body
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        let sha = body
            .get("sha")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(RemoteEntry::File(RemoteFile {
            content: Self::decode_content(encoded)?,
            sha,
        }))
    }

    async fn put_file(&self, path: &str, content: &str, sha: &str, message: &str) -> Result<()> {
        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.config.branch,
        });
        if !sha.is_empty() {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        let response = self
            .add_headers(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        tracing::info!(path, "Committed file to branch");
        Ok(())
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<()> {
        let body = serde_json::json!({
            "message": message,
            "sha": sha,
            "branch": self.config.branch,
        });

        let response = self
            .add_headers(self.client.delete(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        tracing::info!(path, "Deleted file from branch");
        Ok(())
    }

    async fn search_code(&self, query: &str) -> Result<Vec<String>> {
        let q = format!(
            "{query} repo:{}/{}",
            self.config.owner, self.config.repo
        );
        let response = self
            .add_headers(
                self.client
                    .get(format!("{}/search/code", self.config.base_url)),
            )
            .query(&[("q", q.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GithubError::Decode(e.to_string()))?;
        Ok(body
            .get("items")
            .and_then(|i| i.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("path").and_then(|p| p.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn file_tree(&self, dir_path: &str) -> Result<Vec<String>> {
        match self.get_file(dir_path).await? {
            RemoteEntry::Directory(paths) => Ok(paths),
            RemoteEntry::Missing => Ok(Vec::new()),
            RemoteEntry::File(_) => Ok(vec![dir_path.to_string()]),
        }
    }

    async fn update_comment(&self, body: &str) -> Result<()> {
        let Some(comment_id) = self.config.progress_comment_id else {
            tracing::debug!("No progress comment configured, skipping update");
            return Ok(());
        };

        let url = format!(
            "{}/repos/{}/{}/issues/comments/{comment_id}",
            self.config.base_url, self.config.owner, self.config.repo
        );
        let response = self
            .add_headers(self.client.patch(url))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_handles_wrapped_base64() {
        // "hello world\n" encoded and wrapped the way GitHub returns it.
        let encoded = "aGVsbG8g\nd29ybGQK\n";
        assert_eq!(
            GithubClient::decode_content(encoded).unwrap(),
            "hello world\n"
        );
    }

    #[test]
    fn test_decode_content_rejects_garbage() {
        assert!(GithubClient::decode_content("!!!not base64!!!").is_err());
    }

    #[test]
    fn test_client_requires_branch() {
        let config = GithubConfig::new("token", "owner", "repo", "");
        assert!(matches!(
            GithubClient::new(config),
            Err(GithubError::Config(_))
        ));
    }

    #[test]
    fn test_contents_url() {
        let config = GithubConfig::new("t", "octo", "hello", "main");
        let client = GithubClient::new(config).unwrap();
        assert_eq!(
            client.contents_url("src/main.rs"),
            "https://api.github.com/repos/octo/hello/contents/src/main.rs"
        );
    }
}
