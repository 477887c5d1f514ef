//! OpenAI chat-completions backend.
//!
//! Translates the shared (Anthropic-shaped) request/response types to and
//! from the OpenAI wire format: tool uses become `tool_calls`, tool
//! results become `tool`-role messages.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;

use crate::backend::{LlmBackend, with_retry};
use crate::error::{LlmError, Result};
use crate::types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Role, StopReason, Usage,
};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries for transient errors.
    pub max_retries: u32,
    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Create config from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LlmError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a backend from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
    }

    fn to_openai_request(request: &CompletionRequest) -> OpenAiChatRequest {
        let mut messages = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for m in &request.messages {
            match &m.content {
                Content::Text(text) => messages.push(OpenAiMessage {
                    role: role_str(m.role).to_string(),
                    content: Some(text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
                Content::Blocks(blocks) => {
                    push_block_messages(&mut messages, m.role, blocks);
                }
            }
        }

        let tools: Option<Vec<OpenAiTool>> = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OpenAiTool {
                        tool_type: "function".to_string(),
                        function: OpenAiFunction {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        OpenAiChatRequest {
            model: request.model.clone(),
            messages,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
        }
    }

    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: OpenAiChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))?;
        Ok(parsed.into())
    }

    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<OpenAiErrorResponse>(&body) {
            match status.as_u16() {
                401 => LlmError::Auth(format!("Authentication failed: {}", error.error.message)),
                429 => LlmError::RateLimit(error.error.message),
                500..=599 => LlmError::Api(format!("Server error: {}", error.error.message)),
                _ => LlmError::Api(error.error.message),
            }
        } else {
            LlmError::Api(format!("HTTP {status}: {body}"))
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Split structured blocks into the flat message list OpenAI expects.
fn push_block_messages(messages: &mut Vec<OpenAiMessage>, role: Role, blocks: &[ContentBlock]) {
    let tool_calls: Vec<OpenAiToolCall> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some(OpenAiToolCall {
                id: id.clone(),
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name: name.clone(),
                    arguments: serde_json::to_string(input).unwrap_or_default(),
                },
            }),
            _ => None,
        })
        .collect();

    let text_content: String = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");

    let tool_results: Vec<(&str, &str)> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => Some((tool_use_id.as_str(), content.as_str())),
            _ => None,
        })
        .collect();

    if !tool_results.is_empty() {
        for (tool_id, result_text) in tool_results {
            messages.push(OpenAiMessage {
                role: "tool".to_string(),
                content: Some(result_text.to_string()),
                tool_calls: None,
                tool_call_id: Some(tool_id.to_string()),
            });
        }
    } else if !tool_calls.is_empty() {
        messages.push(OpenAiMessage {
            role: "assistant".to_string(),
            content: if text_content.is_empty() {
                None
            } else {
                Some(text_content)
            },
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
    } else {
        messages.push(OpenAiMessage {
            role: role_str(role).to_string(),
            content: Some(text_content),
            tool_calls: None,
            tool_call_id: None,
        });
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let openai_request = Self::to_openai_request(&request);

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "openai",
            || async {
                let response = self
                    .add_headers(self.client.post(self.completions_url()))
                    .json(&openai_request)
                    .send()
                    .await?;

                Self::handle_response(response).await
            },
        )
        .await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, serde::Serialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, serde::Serialize)]
struct OpenAiFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    /// JSON-encoded arguments string.
    arguments: String,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChatResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

impl From<OpenAiChatResponse> for CompletionResponse {
    fn from(resp: OpenAiChatResponse) -> Self {
        let mut content = Vec::new();
        let mut stop_reason = Some(StopReason::EndTurn);

        if let Some(choice) = resp.choices.into_iter().next() {
            if let Some(text) = choice.message.content
                && !text.is_empty()
            {
                content.push(ContentBlock::Text { text });
            }
            for call in choice.message.tool_calls.unwrap_or_default() {
                let input = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::Null);
                content.push(ContentBlock::ToolUse {
                    id: call.id,
                    name: call.function.name,
                    input,
                });
            }
            stop_reason = choice.finish_reason.as_deref().map(|s| match s {
                "tool_calls" => StopReason::ToolUse,
                "length" => StopReason::MaxTokens,
                "stop" => StopReason::EndTurn,
                _ => StopReason::EndTurn,
            });
        }

        let usage = resp
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        CompletionResponse {
            id: resp.id,
            content,
            model: resp.model,
            stop_reason,
            usage,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, ToolDefinition, ToolResultBlock};

    #[test]
    fn test_tool_use_maps_to_tool_calls() {
        let request = CompletionRequest::new(
            "gpt-5",
            vec![
                Message::user("fix the bug"),
                Message::assistant_blocks(vec![ContentBlock::tool_use(
                    "t1",
                    "apply_diff_to_file",
                    serde_json::json!({"file_path": "a.rs", "diff": "..."}),
                )]),
                Message::tool_result(ToolResultBlock::success("t1", "applied")),
            ],
            4096,
        )
        .with_system("You are an agent.");

        let wire = OpenAiBackend::to_openai_request(&request);
        assert_eq!(wire.messages.len(), 4);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[1].role, "user");
        assert_eq!(wire.messages[2].role, "assistant");
        let calls = wire.messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "apply_diff_to_file");
        assert_eq!(wire.messages[3].role, "tool");
        assert_eq!(wire.messages[3].tool_call_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_tools_serialize_as_functions() {
        let request = CompletionRequest::new("gpt-5", vec![Message::user("hi")], 100).with_tools(
            vec![ToolDefinition::new(
                "search_web",
                "Search the web",
                serde_json::json!({"type": "object"}),
            )],
        );
        let wire = OpenAiBackend::to_openai_request(&request);
        let tools = wire.tools.unwrap();
        assert_eq!(tools[0].tool_type, "function");
        assert_eq!(tools[0].function.name, "search_web");
    }

    #[test]
    fn test_response_conversion_with_tool_calls() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-5",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_remote_file_content",
                            "arguments": "{\"file_path\": \"src/lib.rs\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 12}
        });
        let resp: OpenAiChatResponse = serde_json::from_value(body).unwrap();
        let response: CompletionResponse = resp.into();

        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        let tool = response.first_tool_use().unwrap();
        assert_eq!(tool.name, "get_remote_file_content");
        assert_eq!(tool.input["file_path"], "src/lib.rs");
        assert_eq!(response.usage.input_tokens, 50);
    }

    #[test]
    fn test_unparseable_arguments_become_null() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-5",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "f", "arguments": "not json"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": null
        });
        let resp: OpenAiChatResponse = serde_json::from_value(body).unwrap();
        let response: CompletionResponse = resp.into();
        let tool = response.first_tool_use().unwrap();
        assert!(tool.input.is_null());
    }
}
