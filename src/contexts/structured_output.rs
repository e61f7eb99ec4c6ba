//! Schema-constrained model output.
//!
//! Each synthesis stage asks for JSON matching a fixed schema and parses the
//! reply strictly. What happens when the reply does not match is decided in
//! one place, [`invoke_structured`], according to a [`SchemaViolationPolicy`].

use regex::Regex;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use super::automator::PipelineError;
use crate::model::{ChatModel, ChatRequest, Message};

/// The model reply could not be read as the requested schema.
#[derive(Error, Debug)]
#[error("Model output does not match the {schema} schema: {reason}")]
pub struct OutputParseError {
    pub schema: String,
    pub reason: String,
}

/// What to do when a model reply violates the requested schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SchemaViolationPolicy {
    /// Abort the run on the first violation.
    #[default]
    Fail,
    /// Ask again, showing the model its previous reply and the parse error,
    /// up to `attempts` more times.
    Retry { attempts: u32 },
}

impl SchemaViolationPolicy {
    /// Total number of model calls allowed for one structured request.
    pub fn max_calls(self) -> u32 {
        match self {
            SchemaViolationPolicy::Fail => 1,
            SchemaViolationPolicy::Retry { attempts } => attempts.saturating_add(1),
        }
    }
}

/// Instructions appended to a prompt so the model answers with JSON matching
/// the schema of `T`.
pub fn format_instructions<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    let schema_json = serde_json::to_string(&schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
         As an example, for the schema {{\"properties\": {{\"foo\": {{\"title\": \"Foo\", \"description\": \"a list of strings\", \"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
         the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
         The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\n\
         Here is the output schema:\n```\n{}\n```",
        schema_json
    )
}

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"))
}

/// Strictly parses `text` as `T`.
///
/// The reply is tried as-is, then the content of its first fenced code
/// block, then the span between its first `{` and last `}`. The first
/// candidate that deserializes wins; no field is ever filled in.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, OutputParseError> {
    let schema = short_type_name::<T>();
    let trimmed = text.trim();

    let mut candidates = vec![trimmed];
    if let Some(block) = fenced_block_regex()
        .captures(trimmed)
        .and_then(|c| c.get(1))
    {
        candidates.push(block.as_str().trim());
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    let mut first_error = None;
    for candidate in candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(OutputParseError {
        schema,
        reason: first_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "empty output".to_string()),
    })
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// Sends `request` and parses the reply as `T`, applying `policy` when the
/// reply does not match. Token usage of every call is logged under `stage`.
pub async fn invoke_structured<T: DeserializeOwned>(
    model: &dyn ChatModel,
    request: ChatRequest,
    policy: SchemaViolationPolicy,
    stage: &'static str,
) -> Result<T, PipelineError> {
    let max_calls = policy.max_calls();
    let mut request = request;
    let mut call = 0;

    loop {
        call += 1;
        let response = model.invoke(&request).await?;
        match response.usage {
            Some(usage) => tracing::info!(
                stage,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "model usage"
            ),
            None => tracing::info!(stage, "model usage not reported"),
        }

        let error = match parse_structured::<T>(&response.text) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if call >= max_calls {
            return Err(PipelineError::SchemaViolation {
                stage,
                attempts: call,
                source: error,
            });
        }

        tracing::warn!(stage, attempt = call, error = %error, "schema violation, asking again");
        request.messages.push(response.into_message());
        request.messages.push(Message::user(format!(
            "Your answer could not be parsed: {}\nAnswer again with a single JSON object that matches the schema, and nothing else.",
            error.reason
        )));
    }
}
