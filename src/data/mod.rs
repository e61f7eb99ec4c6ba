mod action;
mod artifact;
mod cache;
mod diagnostic;
mod hierarchy;

pub use action::{
    ActionFrame, ActionKind, ActionRecord, ElementInfo, ElementLookup, ImplementationAction,
    InterfaceAction,
};
pub use artifact::{ProjectFiles, SourceArtifact, ViewExtraction};
pub use cache::Cache;
pub use diagnostic::BuildDiagnostic;
pub use hierarchy::{HierarchyNode, NodeField, ViewNode, without_fields};
