use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::automator::PipelineError;
use super::structured_output::{SchemaViolationPolicy, format_instructions, invoke_structured};
use crate::data::{SourceArtifact, ViewExtraction};
use crate::model::{ChatModel, ChatRequest, Message};

/// Where per-component files live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentLayout {
    /// Path segment followed by `<component>/<file>`
    pub component_segment: String,
    pub actions_suffix: String,
    pub assertions_suffix: String,
    /// File name of the aggregate screens file
    pub aggregate_file: String,
}

impl Default for ComponentLayout {
    fn default() -> Self {
        Self {
            component_segment: "implementation".to_string(),
            actions_suffix: "Actions.kt".to_string(),
            assertions_suffix: "Assertions.kt".to_string(),
            aggregate_file: "ScreensUiAutomator.kt".to_string(),
        }
    }
}

/// Role of an implementation file in view extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRole {
    Actions { component: String },
    Assertions { component: String },
    Aggregate,
    Unclassified,
}

/// Classifies `path` against `layout`.
///
/// A path containing `<segment>/<component>/<file>` is an actions or
/// assertions file of `component` when `file` carries the matching suffix.
/// Otherwise a path ending with the aggregate file name is the aggregate.
pub fn classify(path: &str, layout: &ComponentLayout) -> FileRole {
    match component_and_file(path, &layout.component_segment) {
        Some((component, file)) if file.ends_with(&layout.actions_suffix) => FileRole::Actions {
            component: component.to_string(),
        },
        Some((component, file)) if file.ends_with(&layout.assertions_suffix) => {
            FileRole::Assertions {
                component: component.to_string(),
            }
        }
        Some(_) => FileRole::Unclassified,
        None if path.ends_with(&layout.aggregate_file) => FileRole::Aggregate,
        None => FileRole::Unclassified,
    }
}

/// First `<segment>/<component>/<file>` occurrence in `path`.
fn component_and_file<'a>(path: &'a str, segment: &str) -> Option<(&'a str, &'a str)> {
    let marker = format!("{}/", segment);
    path.match_indices(&marker).find_map(|(start, _)| {
        let rest = &path[start + marker.len()..];
        let (component, tail) = rest.split_once('/')?;
        let file = tail.split('/').next().unwrap_or_default();
        (!component.is_empty() && !file.is_empty()).then_some((component, file))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentGroup {
    pub name: String,
    pub actions: Option<SourceArtifact>,
    pub assertions: Option<SourceArtifact>,
}

/// Implementation files partitioned for view extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGrouping {
    /// Components in the order their first file appears
    pub components: Vec<ComponentGroup>,
    pub aggregate: Option<SourceArtifact>,
    pub unclassified: Vec<SourceArtifact>,
}

/// Buckets `files` per component. When a component has several actions (or
/// assertions) files, or several aggregates exist, the last one wins and the
/// earlier ones are kept as unclassified.
pub fn group_by_component(files: &[SourceArtifact], layout: &ComponentLayout) -> ComponentGrouping {
    let mut grouping = ComponentGrouping::default();

    for file in files {
        match classify(&file.path, layout) {
            FileRole::Actions { component } => {
                let group = grouping.group_mut(&component);
                if let Some(previous) = group.actions.replace(file.clone()) {
                    grouping.unclassified.push(previous);
                }
            }
            FileRole::Assertions { component } => {
                let group = grouping.group_mut(&component);
                if let Some(previous) = group.assertions.replace(file.clone()) {
                    grouping.unclassified.push(previous);
                }
            }
            FileRole::Aggregate => {
                if let Some(previous) = grouping.aggregate.replace(file.clone()) {
                    grouping.unclassified.push(previous);
                }
            }
            FileRole::Unclassified => grouping.unclassified.push(file.clone()),
        }
    }

    grouping
}

impl ComponentGrouping {
    fn group_mut(&mut self, component: &str) -> &mut ComponentGroup {
        let position = match self.components.iter().position(|g| g.name == component) {
            Some(position) => position,
            None => {
                self.components.push(ComponentGroup {
                    name: component.to_string(),
                    actions: None,
                    assertions: None,
                });
                self.components.len() - 1
            }
        };
        &mut self.components[position]
    }
}

/// Splits one component's actions and assertions into a view tree, updating
/// the aggregate screens file on the way.
pub struct ViewExtractor {
    model: Arc<dyn ChatModel>,
    prompt: String,
    policy: SchemaViolationPolicy,
}

impl ViewExtractor {
    pub fn new(model: Arc<dyn ChatModel>, prompt: String, policy: SchemaViolationPolicy) -> Self {
        Self {
            model,
            prompt,
            policy,
        }
    }

    pub async fn extract(
        &self,
        actions: &SourceArtifact,
        assertions: &SourceArtifact,
        aggregate: &SourceArtifact,
    ) -> Result<ViewExtraction, PipelineError> {
        let human = format!(
            "\n# Actions class:\n{}\n\n# Assertions class:\n{}\n\n# {}:\n{}\n\n{}\n",
            actions.source,
            assertions.source,
            aggregate_name(aggregate),
            aggregate.source,
            format_instructions::<ViewExtraction>()
        );
        let request = ChatRequest::new(vec![Message::system(&self.prompt), Message::user(human)]);

        invoke_structured(self.model.as_ref(), request, self.policy, "extract_view").await
    }
}

fn aggregate_name(aggregate: &SourceArtifact) -> &str {
    aggregate.path.rsplit('/').next().unwrap_or(&aggregate.path)
}
