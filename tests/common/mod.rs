#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use verter::contexts::BuildRunner;
use verter::data::{ActionFrame, ProjectFiles, SourceArtifact, ViewExtraction};
use verter::model::{ChatModel, ChatRequest, ChatResponse, ModelError, ToolCall, Usage};

/// A model that answers from a script and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    fallback: Option<ChatResponse>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers with `response` forever once the script is exhausted.
    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| ModelError::InvalidResponse("script exhausted".to_string()))
    }
}

/// A build that replays canned outputs; the last one repeats.
pub struct FakeBuild {
    outputs: Mutex<VecDeque<String>>,
    runs: Mutex<usize>,
}

impl FakeBuild {
    pub fn new(outputs: Vec<String>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            runs: Mutex::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        *self.runs.lock().unwrap()
    }
}

#[async_trait]
impl BuildRunner for FakeBuild {
    async fn run(&self) -> String {
        *self.runs.lock().unwrap() += 1;
        let mut outputs = self.outputs.lock().unwrap();
        if outputs.len() > 1 {
            outputs.pop_front().unwrap_or_default()
        } else {
            outputs.front().cloned().unwrap_or_default()
        }
    }
}

pub fn text(content: impl Into<String>) -> ChatResponse {
    ChatResponse {
        usage: Some(Usage {
            input_tokens: 100,
            output_tokens: 20,
        }),
        ..ChatResponse::text(content)
    }
}

pub fn tool_call(name: &str, arguments: serde_json::Value) -> ChatResponse {
    ChatResponse {
        text: String::new(),
        tool_calls: vec![ToolCall {
            id: format!("toolu_{}", name),
            name: name.to_string(),
            arguments,
        }],
        usage: None,
    }
}

pub fn files_response(files: &[(&str, &str)]) -> ChatResponse {
    let files = ProjectFiles {
        files: files
            .iter()
            .map(|(path, source)| SourceArtifact::new(*path, *source))
            .collect(),
    };
    text(serde_json::to_string(&files).unwrap())
}

pub fn extraction_response(component: &str, screens: &str) -> ChatResponse {
    let extraction = ViewExtraction {
        actions: SourceArtifact::new(
            format!("implementation/{0}/{0}UiAutomatorActions.kt", component),
            format!("class {}Actions(view)", component),
        ),
        assertions: SourceArtifact::new(
            format!("implementation/{0}/{0}UiAutomatorAssertions.kt", component),
            format!("class {}Assertions(view)", component),
        ),
        view: SourceArtifact::new(
            format!("implementation/{0}/{0}View.kt", component),
            format!("class {}View", component),
        ),
        screens_implementation: SourceArtifact::new("implementation/ScreensUiAutomator.kt", screens),
    };
    // Fenced, the way models usually answer.
    text(format!(
        "```json\n{}\n```",
        serde_json::to_string_pretty(&extraction).unwrap()
    ))
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn add_delete_trace() -> Vec<ActionFrame> {
    let content = std::fs::read_to_string(fixture_path("add_delete_task.json")).unwrap();
    verter::contexts::parse_trace(&content).unwrap()
}

/// Full text of a request as sent, for information-hiding checks.
pub fn request_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .map(|m| m.content().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
