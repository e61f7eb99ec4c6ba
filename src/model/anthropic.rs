use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{ChatModel, ChatRequest, ChatResponse, Message, ModelError, ToolCall, Usage};
use crate::settings::ModelSettings;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude over the Anthropic Messages API.
pub struct AnthropicModel {
    settings: ModelSettings,
    client: Client,
    api_key: String,
}

impl AnthropicModel {
    pub fn new(settings: ModelSettings, api_key: String) -> Result<Self, ModelError> {
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey(
                "Anthropic API key cannot be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            settings,
            client,
            api_key: api_key.trim().to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.settings.endpoint.trim_end_matches('/');
        format!("{}{}", base, path)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Splits system messages out and folds the rest into alternating turns.
/// Consecutive messages of the same role share one turn; tool results travel
/// in the user turn that follows the assistant's tool calls.
fn to_api_messages(messages: &[Message]) -> (Option<String>, Vec<ApiMessage>) {
    let mut system: Vec<&str> = Vec::new();
    let mut turns: Vec<ApiMessage> = Vec::new();

    for message in messages {
        let (role, blocks) = match message {
            Message::System { content } => {
                system.push(content);
                continue;
            }
            Message::User { content } => ("user", vec![ContentBlock::Text { text: content.clone() }]),
            Message::Tool { call_id, content } => (
                "user",
                vec![ContentBlock::ToolResult {
                    tool_use_id: call_id.clone(),
                    content: content.clone(),
                }],
            ),
            Message::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if !content.trim().is_empty() || tool_calls.is_empty() {
                    let text = if content.trim().is_empty() {
                        "(no content)".to_string()
                    } else {
                        content.clone()
                    };
                    blocks.push(ContentBlock::Text { text });
                }
                blocks.extend(tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                }));
                ("assistant", blocks)
            }
        };

        match turns.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => turns.push(ApiMessage { role, content: blocks }),
        }
    }

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, turns)
}

#[async_trait]
impl ChatModel for AnthropicModel {
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn invoke(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let (system, messages) = to_api_messages(&request.messages);
        let body = MessagesRequest {
            model: &self.settings.name,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system,
            messages,
            tools: request
                .tools
                .iter()
                .map(|tool| ApiTool {
                    name: &tool.name,
                    description: &tool.description,
                    input_schema: &tool.input_schema,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.api_url("/messages"))
            .headers(self.auth_headers())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(error) = serde_json::from_str::<ApiError>(&text) {
                if status.as_u16() == 401 || error.error.error_type == "authentication_error" {
                    return Err(ModelError::AuthFailed(error.error.message));
                }
                if status.as_u16() == 429 || error.error.error_type == "rate_limit_error" {
                    return Err(ModelError::RateLimited);
                }
                return Err(ModelError::Api {
                    status: status.as_u16(),
                    message: error.error.message,
                });
            }
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text: chunk } => text.push_str(&chunk),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => {}
            }
        }

        Ok(ChatResponse {
            text,
            tool_calls,
            usage: parsed.usage.map(|u| Usage {
                input_tokens: u.input_tokens.unwrap_or(0),
                output_tokens: u.output_tokens.unwrap_or(0),
            }),
        })
    }
}
