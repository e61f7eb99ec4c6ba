use crate::contexts::{PromptError, PromptTemplate};
use std::fs;
use std::path::PathBuf;

/// Prompts used across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptName {
    CreateInterfaces,
    CreateImplementation,
    Refactoring,
    ExtractView,
    FixBuild,
}

impl PromptName {
    pub const ALL: [PromptName; 5] = [
        PromptName::CreateInterfaces,
        PromptName::CreateImplementation,
        PromptName::Refactoring,
        PromptName::ExtractView,
        PromptName::FixBuild,
    ];

    /// File name (without `.md`) of the prompt inside a prompts directory.
    pub fn file_stem(self) -> &'static str {
        match self {
            PromptName::CreateInterfaces => "create_dsl_interfaces",
            PromptName::CreateImplementation => "create_implementation_uiautomator",
            PromptName::Refactoring => "uiautomator_refactoring",
            PromptName::ExtractView => "extract_view",
            PromptName::FixBuild => "fix_build",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptName::CreateInterfaces => include_str!("../../prompts/create_dsl_interfaces.md"),
            PromptName::CreateImplementation => {
                include_str!("../../prompts/create_implementation_uiautomator.md")
            }
            PromptName::Refactoring => include_str!("../../prompts/uiautomator_refactoring.md"),
            PromptName::ExtractView => include_str!("../../prompts/extract_view.md"),
            PromptName::FixBuild => include_str!("../../prompts/fix_build.md"),
        }
    }
}

/// Trait for loading prompt text by name
pub trait PromptRegistry {
    fn get_prompt(&self, name: PromptName) -> Result<String, PromptError>;
}

/// Loads prompts from `<prompts_dir>/<name>.md`, falling back to the prompts
/// built into the binary when no override exists.
#[derive(Debug, Clone, Default)]
pub struct FilePromptRegistry {
    prompts_dir: Option<PathBuf>,
}

impl FilePromptRegistry {
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        Self { prompts_dir }
    }
}

impl PromptRegistry for FilePromptRegistry {
    fn get_prompt(&self, name: PromptName) -> Result<String, PromptError> {
        let Some(dir) = &self.prompts_dir else {
            return Ok(name.builtin().to_string());
        };

        let path = dir.join(format!("{}.md", name.file_stem()));
        if !path.exists() {
            tracing::debug!(prompt = name.file_stem(), "no override found, using built-in prompt");
            return Ok(name.builtin().to_string());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PromptError::InvalidPrompt(format!("Failed to read prompt {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Err(PromptError::InvalidPrompt(format!(
                "Prompt {} is empty",
                path.display()
            )));
        }
        Ok(content)
    }
}

/// Every prompt the pipeline needs, loaded once up front.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub create_interfaces: PromptTemplate,
    pub create_implementation: String,
    pub refactoring: String,
    pub extract_view: String,
    pub fix_build: String,
}

impl PromptSet {
    pub fn load(registry: &impl PromptRegistry) -> Result<Self, PromptError> {
        Ok(Self {
            create_interfaces: PromptTemplate::parse(&registry.get_prompt(PromptName::CreateInterfaces)?)?,
            create_implementation: registry.get_prompt(PromptName::CreateImplementation)?,
            refactoring: registry.get_prompt(PromptName::Refactoring)?,
            extract_view: registry.get_prompt(PromptName::ExtractView)?,
            fix_build: registry.get_prompt(PromptName::FixBuild)?,
        })
    }

    pub fn builtin() -> Result<Self, PromptError> {
        Self::load(&FilePromptRegistry::default())
    }
}
