//! Test-code synthesis pipeline.
//!
//! The pipeline is an explicit state machine over [`PipelineState`]:
//!
//! ```text
//! CreateInterfaces -> CreateImplementation -> Refactoring* -> ExtractViews -> Done
//! ```
//!
//! Every step takes the state, mutates it, and names the next step. Steps
//! run strictly one after another and each step awaits its model call before
//! the next one starts.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::normalizer::normalize;
use super::prompt::PromptError;
use super::structured_output::{
    OutputParseError, SchemaViolationPolicy, format_instructions, invoke_structured,
};
use super::view_extractor::{ComponentLayout, ViewExtractor, group_by_component};
use crate::data::{ActionFrame, ActionRecord, ProjectFiles, SourceArtifact};
use crate::model::{ChatModel, ChatRequest, Message, ModelError};
use crate::registries::PromptSet;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Stage {stage} failed after {attempts} attempt(s): {source}")]
    SchemaViolation {
        stage: &'static str,
        attempts: u32,
        #[source]
        source: OutputParseError,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Failed to serialize stage input: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Steps of the synthesis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    CreateInterfaces,
    CreateImplementation,
    Refactoring,
    ExtractViews,
    Done,
}

/// Record threaded through every step.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub scenario: String,
    pub actions: Vec<ActionRecord>,
    pub interfaces: Vec<SourceArtifact>,
    pub implementation: Vec<SourceArtifact>,
    /// Next implementation file to refactor
    pub refactoring_index: usize,
    /// Refactor iterations performed so far
    pub refactor_iterations: usize,
    /// View-extraction calls performed so far
    pub components_extracted: usize,
}

impl PipelineState {
    pub fn new(scenario: impl Into<String>, actions: Vec<ActionRecord>) -> Self {
        Self {
            scenario: scenario.into(),
            actions,
            ..Self::default()
        }
    }

    /// Interfaces followed by implementation, the final artifact set.
    pub fn into_artifacts(self) -> Vec<SourceArtifact> {
        let mut files = self.interfaces;
        files.extend(self.implementation);
        files
    }
}

#[derive(Serialize)]
struct InterfacePromptInput<'a> {
    scenario: &'a str,
    user_actions: String,
    format_instructions: String,
}

/// Generates UI-test sources from a scenario and its recorded interactions.
pub struct Automator {
    model: Arc<dyn ChatModel>,
    prompts: PromptSet,
    layout: ComponentLayout,
    policy: SchemaViolationPolicy,
    view_extractor: ViewExtractor,
}

impl Automator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        prompts: PromptSet,
        layout: ComponentLayout,
        policy: SchemaViolationPolicy,
    ) -> Self {
        let view_extractor = ViewExtractor::new(model.clone(), prompts.extract_view.clone(), policy);
        Self {
            model,
            prompts,
            layout,
            policy,
            view_extractor,
        }
    }

    /// Normalizes `frames` and runs the whole pipeline, returning interfaces
    /// followed by implementation files.
    pub async fn code(
        &self,
        scenario: &str,
        frames: &[ActionFrame],
    ) -> Result<Vec<SourceArtifact>, PipelineError> {
        let state = self.run(PipelineState::new(scenario, normalize(frames))).await?;
        Ok(state.into_artifacts())
    }

    /// Drives `state` from the first step to the end.
    pub async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let mut step = PipelineStep::CreateInterfaces;
        while step != PipelineStep::Done {
            tracing::debug!(?step, "pipeline step");
            step = match step {
                PipelineStep::CreateInterfaces => {
                    self.create_interfaces(&mut state).await?;
                    PipelineStep::CreateImplementation
                }
                PipelineStep::CreateImplementation => {
                    self.create_implementation(&mut state).await?;
                    refactoring_needed(&state)
                }
                PipelineStep::Refactoring => {
                    self.refactor(&mut state).await?;
                    refactoring_needed(&state)
                }
                PipelineStep::ExtractViews => {
                    self.extract_views(&mut state).await?;
                    PipelineStep::Done
                }
                PipelineStep::Done => PipelineStep::Done,
            };
        }
        Ok(state)
    }

    async fn create_interfaces(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let user_actions: Vec<_> = state.actions.iter().map(ActionRecord::for_interfaces).collect();
        let input = InterfacePromptInput {
            scenario: &state.scenario,
            user_actions: serde_json::to_string(&user_actions)?,
            format_instructions: format_instructions::<ProjectFiles>(),
        };
        let prompt = self.prompts.create_interfaces.render(&input)?;
        let request = ChatRequest::new(vec![Message::user(prompt)]);

        let files: ProjectFiles =
            invoke_structured(self.model.as_ref(), request, self.policy, "create_interfaces")
                .await?;
        tracing::info!(count = files.files.len(), "interfaces written");
        state.interfaces = files.files;
        Ok(())
    }

    async fn create_implementation(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let user_actions: Vec<_> = state
            .actions
            .iter()
            .map(ActionRecord::for_implementation)
            .collect();
        let interfaces = state
            .interfaces
            .iter()
            .map(SourceArtifact::render_block)
            .collect::<Vec<_>>()
            .join("\n\n");
        let human = format!(
            "\nInterfaces:\n{}\n\nTest Scenario:\n{}\n\nUser Interactions:\n{}\n\n{}\n",
            interfaces,
            state.scenario,
            serde_json::to_string(&user_actions)?,
            format_instructions::<ProjectFiles>()
        );
        let request = ChatRequest::new(vec![
            Message::system(&self.prompts.create_implementation),
            Message::user(human),
        ]);

        let files: ProjectFiles = invoke_structured(
            self.model.as_ref(),
            request,
            self.policy,
            "create_implementation",
        )
        .await?;
        tracing::info!(count = files.files.len(), "implementation written");
        state.implementation = files.files;
        state.refactoring_index = 0;
        Ok(())
    }

    /// Replaces the current file's source with the model's raw reply.
    async fn refactor(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let index = state.refactoring_index;
        let Some(file) = state.implementation.get_mut(index) else {
            state.refactoring_index = state.implementation.len();
            return Ok(());
        };

        let request = ChatRequest::new(vec![
            Message::system(&self.prompts.refactoring),
            Message::user(format!("### Source code:\n{}", file.source)),
        ]);
        let response = self.model.invoke(&request).await?;
        tracing::info!(path = %file.path, "file refactored");
        file.source = response.text;

        state.refactoring_index += 1;
        state.refactor_iterations += 1;
        Ok(())
    }

    /// Replaces the implementation with three files per extracted component
    /// followed by the final aggregate. Without an aggregate nothing changes.
    async fn extract_views(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let grouping = group_by_component(&state.implementation, &self.layout);

        let Some(mut aggregate) = grouping.aggregate else {
            tracing::warn!(
                aggregate = %self.layout.aggregate_file,
                "no aggregate file among implementation files, skipping view extraction"
            );
            return Ok(());
        };

        if !grouping.unclassified.is_empty() {
            let dropped: Vec<&str> = grouping.unclassified.iter().map(|f| f.path.as_str()).collect();
            tracing::warn!(?dropped, "files outside any component are not carried past view extraction");
        }

        let mut extracted = Vec::new();
        for group in grouping.components {
            match (group.actions, group.assertions) {
                (Some(actions), Some(assertions)) => {
                    let result = self
                        .view_extractor
                        .extract(&actions, &assertions, &aggregate)
                        .await?;
                    tracing::info!(component = %group.name, "view extracted");
                    aggregate = result.screens_implementation;
                    extracted.push(result.actions);
                    extracted.push(result.assertions);
                    extracted.push(result.view);
                    state.components_extracted += 1;
                }
                _ => {
                    tracing::warn!(
                        component = %group.name,
                        "component lacks an actions or assertions file, dropping it"
                    );
                }
            }
        }
        extracted.push(aggregate);

        state.implementation = extracted;
        Ok(())
    }
}

/// Guard after implementation and after each refactor.
fn refactoring_needed(state: &PipelineState) -> PipelineStep {
    if state.refactoring_index < state.implementation.len() {
        PipelineStep::Refactoring
    } else {
        PipelineStep::ExtractViews
    }
}
