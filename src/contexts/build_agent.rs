//! Build-fix agent.
//!
//! ```text
//! RunBuild -> decide -> FixErrors <-> Tools
//!                          |
//!                          +-> RunBuild (no tool call)
//! ```
//!
//! `decide` ends the session when the build succeeds or when the failed
//! build yields no diagnostic. Every node execution counts as one step and
//! the session stops once the step budget is spent.

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::build_runner::BuildRunner;
use super::build_tools::BuildTools;
use super::diagnostics::{build_summary_message, parse_build_errors};
use super::sandbox::{relative_to_root, resolve_within};
use crate::data::BuildDiagnostic;
use crate::model::{ChatModel, ChatRequest, Message, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixStatus {
    Running,
    Fixed,
    MaxAttemptsReached,
}

/// How a fix session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    /// The build succeeded
    Fixed,
    /// The build failed but no diagnostic could be extracted
    NoActionableDiagnostics,
    /// The step budget ran out
    StepLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedFile {
    pub path: String,
    pub description: String,
}

/// Conversation state of one fix session.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub messages: Vec<Message>,
    pub build_output: String,
    pub errors: Vec<BuildDiagnostic>,
    pub files_examined: Vec<String>,
    pub files_fixed: Vec<FixedFile>,
    pub status: FixStatus,
    pub current_error: Option<BuildDiagnostic>,
}

impl AgentState {
    fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            build_output: String::new(),
            errors: Vec::new(),
            files_examined: Vec::new(),
            files_fixed: Vec::new(),
            status: FixStatus::Running,
            current_error: None,
        }
    }
}

/// Summary of a finished session, without the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub outcome: FixOutcome,
    pub status: FixStatus,
    pub steps: usize,
    pub files_examined: Vec<String>,
    pub files_fixed: Vec<FixedFile>,
    pub remaining_errors: Vec<BuildDiagnostic>,
}

#[derive(Debug, Clone)]
pub struct FixSession {
    pub state: AgentState,
    pub outcome: FixOutcome,
    pub steps: usize,
}

impl FixSession {
    pub fn report(&self) -> FixReport {
        let remaining_errors = match self.outcome {
            FixOutcome::Fixed => Vec::new(),
            _ => self.state.errors.clone(),
        };
        FixReport {
            outcome: self.outcome,
            status: self.state.status,
            steps: self.steps,
            files_examined: self.state.files_examined.clone(),
            files_fixed: self.state.files_fixed.clone(),
            remaining_errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    RunBuild,
    FixErrors,
    Tools,
    End(FixOutcome),
}

pub struct BuildFixAgent {
    project_dir: PathBuf,
    model: Arc<dyn ChatModel>,
    runner: Arc<dyn BuildRunner>,
    tools: BuildTools,
    system_prompt: String,
    success_marker: String,
    max_steps: usize,
}

impl BuildFixAgent {
    /// `project_dir` should be absolute so that absolute paths reported by
    /// the compiler can be mapped back into the project.
    pub fn new(
        project_dir: PathBuf,
        model: Arc<dyn ChatModel>,
        runner: Arc<dyn BuildRunner>,
        system_prompt: String,
        success_marker: String,
        max_steps: usize,
    ) -> Self {
        let tools = BuildTools::new(project_dir.clone(), runner.clone());
        Self {
            project_dir,
            model,
            runner,
            tools,
            system_prompt,
            success_marker,
            max_steps,
        }
    }

    pub async fn build_and_fix(&self) -> Result<FixSession, ModelError> {
        let mut state = AgentState::new(&self.system_prompt);
        let mut node = Node::RunBuild;
        let mut steps = 0;

        let outcome = loop {
            if let Node::End(outcome) = node {
                break outcome;
            }
            if steps >= self.max_steps {
                tracing::warn!(steps, "fix session reached its step limit");
                state.status = FixStatus::MaxAttemptsReached;
                break FixOutcome::StepLimitReached;
            }
            steps += 1;

            node = match node {
                Node::RunBuild => {
                    self.run_build(&mut state).await;
                    self.decide(&mut state)
                }
                Node::FixErrors => {
                    self.fix_errors(&mut state).await?;
                    after_fix(&state)
                }
                Node::Tools => {
                    self.run_tools(&mut state).await;
                    Node::FixErrors
                }
                Node::End(outcome) => Node::End(outcome),
            };
        };

        tracing::info!(?outcome, steps, fixed = state.files_fixed.len(), "fix session finished");
        Ok(FixSession {
            state,
            outcome,
            steps,
        })
    }

    async fn run_build(&self, state: &mut AgentState) {
        let output = self.runner.run().await;
        state.errors = parse_build_errors(&output);
        tracing::info!(errors = state.errors.len(), "build finished");
        state
            .messages
            .push(Message::user(build_summary_message(&output, state.errors.len())));
        state.build_output = output;
    }

    fn decide(&self, state: &mut AgentState) -> Node {
        if state.build_output.contains(&self.success_marker) {
            state.status = FixStatus::Fixed;
            return Node::End(FixOutcome::Fixed);
        }
        match state.errors.first() {
            Some(first) => {
                state.current_error = Some(first.clone());
                Node::FixErrors
            }
            None => {
                tracing::warn!("build failed without any recognizable diagnostic");
                Node::End(FixOutcome::NoActionableDiagnostics)
            }
        }
    }

    async fn fix_errors(&self, state: &mut AgentState) -> Result<(), ModelError> {
        if let Some(error) = state.current_error.clone() {
            let description = serde_json::to_string_pretty(&error)
                .unwrap_or_else(|_| error.message.clone());
            state.messages.push(Message::user(format!(
                "The following error needs to be corrected:\n{}",
                description
            )));

            if let Some(file) = error.file.as_deref().filter(|f| !f.is_empty()) {
                self.attach_file(state, file);
            }
        }

        let request = ChatRequest::new(state.messages.clone()).with_tools(BuildTools::definitions());
        let response = self.model.invoke(&request).await?;
        if let Some(usage) = response.usage {
            tracing::info!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                tool_calls = response.tool_calls.len(),
                "fix step"
            );
        }
        state.messages.push(response.into_message());
        Ok(())
    }

    fn attach_file(&self, state: &mut AgentState, file: &str) {
        let rel_path = relative_to_root(&self.project_dir, file);
        let content = match resolve_within(&self.project_dir, &rel_path) {
            Ok(path) if path.is_file() => fs::read_to_string(&path),
            Ok(_) => {
                state
                    .messages
                    .push(Message::user(format!("File {} not found.", rel_path)));
                return;
            }
            Err(e) => {
                state
                    .messages
                    .push(Message::user(format!("Reading problems: {}", e)));
                return;
            }
        };

        match content {
            Ok(content) => {
                state.messages.push(Message::user(format!(
                    "File content {}:\n\n```kotlin\n{}\n```",
                    rel_path, content
                )));
                if !state.files_examined.contains(&rel_path) {
                    state.files_examined.push(rel_path);
                }
            }
            Err(e) => state
                .messages
                .push(Message::user(format!("Reading problems: {}", e))),
        }
    }

    async fn run_tools(&self, state: &mut AgentState) {
        let calls = state
            .messages
            .last()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default();

        for call in calls {
            let outcome = self.tools.execute(&call).await;
            if let Some(path) = outcome.written {
                let description = match &state.current_error {
                    Some(error) => format!("Fix for: {}", error.message),
                    None => "Edited by the fix agent".to_string(),
                };
                state.files_fixed.push(FixedFile { path, description });
            }
            state.messages.push(Message::Tool {
                call_id: call.id,
                content: outcome.content,
            });
        }
    }
}

/// Guard after `FixErrors`: tool calls go to the tool node, anything else
/// re-checks the build.
fn after_fix(state: &AgentState) -> Node {
    match state.messages.last() {
        Some(message) if !message.tool_calls().is_empty() => Node::Tools,
        _ => Node::RunBuild,
    }
}
