mod artifact_writer;
mod automator;
mod build_agent;
mod build_runner;
mod build_tools;
mod diagnostics;
mod file_cache;
mod normalizer;
mod prompt;
mod sandbox;
mod structured_output;
mod view_extractor;

pub use artifact_writer::{ArtifactError, ArtifactWriter};
pub use automator::{Automator, PipelineError, PipelineState, PipelineStep};
pub use build_agent::{
    AgentState, BuildFixAgent, FixOutcome, FixReport, FixSession, FixStatus, FixedFile,
};
pub use build_runner::{BuildRunner, CommandBuildRunner};
pub use build_tools::{BuildTools, ToolOutcome};
pub use diagnostics::{build_summary_message, parse_build_errors, simplify_build_output};
pub use file_cache::{DEFAULT_CACHE_DIR, FileCache};
pub use normalizer::{HIERARCHY_FIELDS_DROPPED, normalize, parse_trace};
pub use prompt::{PromptError, PromptTemplate};
pub use sandbox::{SandboxError, relative_to_root, resolve_within};
pub use structured_output::{
    OutputParseError, SchemaViolationPolicy, format_instructions, invoke_structured,
    parse_structured,
};
pub use view_extractor::{
    ComponentGroup, ComponentGrouping, ComponentLayout, FileRole, ViewExtractor, classify,
    group_by_component,
};
