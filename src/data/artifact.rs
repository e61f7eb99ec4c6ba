use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Model of a kotlin file.kt from an android ui autotests project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceArtifact {
    /// Relative to project path to file
    #[serde(rename = "relative_filepath")]
    pub path: String,
    /// File sourcecode
    pub source: String,
}

impl SourceArtifact {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Renders the artifact as a path comment followed by its body.
    pub fn render_block(&self) -> String {
        format!("// {}\n{}", self.path, self.source)
    }
}

/// Model of android ui autotests project files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectFiles {
    /// List of autotests project files
    #[serde(rename = "kotlin_files")]
    pub files: Vec<SourceArtifact>,
}

/// Model of files structure after extraction View class and refactoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ViewExtraction {
    /// Actions for view component
    pub actions: SourceArtifact,
    /// Assertions for view component
    pub assertions: SourceArtifact,
    /// View component view tree
    pub view: SourceArtifact,
    /// Implementation of Screens
    pub screens_implementation: SourceArtifact,
}
