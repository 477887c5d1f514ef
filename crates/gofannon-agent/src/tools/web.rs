//! Web search tool.
//!
//! Backed by the DuckDuckGo instant answer API, which needs no key. Good
//! enough for "what does this library's error mean" lookups during
//! exploration; not a general crawler.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolOutput};

/// Maximum results folded back to the model.
const MAX_RESULTS: usize = 10;

/// Tool that searches the web.
#[derive(Debug)]
pub struct SearchWebTool {
    client: Client,
}

impl SearchWebTool {
    /// Create the tool.
    pub fn new() -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("gofannon")
            .build()
            .map_err(|e| crate::error::AgentError::Tool(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    fn collect_results(data: &Value) -> Vec<(String, String)> {
        let mut results = Vec::new();

        if let Some(text) = data["AbstractText"].as_str()
            && !text.is_empty()
        {
            let url = data["AbstractURL"].as_str().unwrap_or("").to_string();
            results.push((url, text.to_string()));
        }

        if let Some(topics) = data["RelatedTopics"].as_array() {
            for topic in topics {
                if results.len() >= MAX_RESULTS {
                    break;
                }
                if let (Some(text), Some(url)) =
                    (topic["Text"].as_str(), topic["FirstURL"].as_str())
                {
                    results.push((url.to_string(), text.to_string()));
                }
            }
        }

        results
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information not present in the repository. \
         Returns result URLs with short summaries."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The web search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let query = match args.required_str("query", "provide the web search query") {
            Ok(v) => v.to_string(),
            Err(e) => return Ok(e.into()),
        };

        let response = match self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("web search failed: {e}"))),
        };
        if !response.status().is_success() {
            return Ok(ToolOutput::error(format!(
                "web search failed with HTTP {}",
                response.status()
            )));
        }
        let data: Value = match response.json().await {
            Ok(d) => d,
            Err(e) => return Ok(ToolOutput::error(format!("web search response: {e}"))),
        };

        let results = Self::collect_results(&data);
        tracing::debug!(query = %query, hits = results.len(), "Searched the web");
        if results.is_empty() {
            return Ok(ToolOutput::text(format!(
                "no web results found for '{query}'"
            )));
        }
        let body = results
            .iter()
            .map(|(url, text)| format!("- {url}\n  {text}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::text(format!(
            "web results for '{query}':\n{body}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_results_prefers_abstract() {
        let data = json!({
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://www.rust-lang.org",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager", "FirstURL": "https://doc.rust-lang.org/cargo"}
            ]
        });
        let results = SearchWebTool::collect_results(&data);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "https://www.rust-lang.org");
    }

    #[test]
    fn test_collect_results_empty() {
        let data = json!({"AbstractText": "", "RelatedTopics": []});
        assert!(SearchWebTool::collect_results(&data).is_empty());
    }
}
