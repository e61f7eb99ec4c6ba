use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::sandbox::resolve_within;
use crate::data::SourceArtifact;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact path {0} must be relative to the output directory")]
    InvalidPath(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes generated files under an output root, mirroring their relative
/// paths.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `artifact` will be written.
    pub fn target(&self, artifact: &SourceArtifact) -> Result<PathBuf, ArtifactError> {
        if artifact.path.trim().is_empty() || Path::new(&artifact.path).is_absolute() {
            return Err(ArtifactError::InvalidPath(artifact.path.clone()));
        }
        let target = resolve_within(&self.root, &artifact.path)
            .map_err(|_| ArtifactError::InvalidPath(artifact.path.clone()))?;
        if target == self.root {
            return Err(ArtifactError::InvalidPath(artifact.path.clone()));
        }
        Ok(target)
    }

    pub fn write(&self, artifact: &SourceArtifact) -> Result<PathBuf, ArtifactError> {
        let target = self.target(artifact)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, &artifact.source).map_err(|source| ArtifactError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(path = %target.display(), "artifact written");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("out"));

        let written = writer
            .write(&SourceArtifact::new("implementation/tasks/TasksView.kt", "class TasksView"))
            .unwrap();

        assert_eq!(written, dir.path().join("out/implementation/tasks/TasksView.kt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "class TasksView");
    }

    #[test]
    fn test_later_artifact_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().to_path_buf());

        writer.write(&SourceArtifact::new("A.kt", "first")).unwrap();
        let path = writer.write(&SourceArtifact::new("A.kt", "second")).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let writer = ArtifactWriter::new(PathBuf::from("/tmp/out"));

        for path in ["/etc/passwd", "../outside.kt", "a/../../b.kt", "", "."] {
            assert!(
                matches!(
                    writer.target(&SourceArtifact::new(path, "")),
                    Err(ArtifactError::InvalidPath(_))
                ),
                "{} was accepted",
                path
            );
        }
    }
}
