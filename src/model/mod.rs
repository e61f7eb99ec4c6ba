//! Language-model boundary.
//!
//! Everything the pipeline knows about a model goes through [`ChatModel`]:
//! an ordered message list (optionally with tool declarations) goes in, text
//! or tool-invocation requests plus usage metadata come out.

mod anthropic;
mod cached;

pub use anthropic::AnthropicModel;
pub use cached::CachedModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised at the model boundary
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot reach model service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model service rejected credentials: {0}")]
    AuthFailed(String),

    #[error("Model service rate limit exceeded")]
    RateLimited,

    #[error("Model service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected model response: {0}")]
    InvalidResponse(String),

    #[error("No API key configured: {0}")]
    MissingApiKey(String),
}

/// One entry of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Converts the response into the assistant message appended to a history.
    pub fn into_message(self) -> Message {
        Message::Assistant {
            content: self.text,
            tool_calls: self.tool_calls,
        }
    }
}

/// A chat model. Calls are awaited one at a time by every caller in this
/// crate; implementations need not support concurrent use of one history.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Name of the underlying model, used for cache partitioning and logs.
    fn name(&self) -> &str;

    async fn invoke(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError>;
}
