use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SandboxError {
    #[error("Path {0} is outside the project directory")]
    Escapes(String),

    #[error("Path {0} is not valid")]
    Invalid(String),
}

/// Resolves `requested` against `root` without touching the filesystem.
///
/// Relative paths are joined to `root`; absolute paths must already lie
/// under it. `..` may not climb above `root`.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, SandboxError> {
    let requested_path = Path::new(requested);
    let relative = if requested_path.is_absolute() {
        requested_path
            .strip_prefix(root)
            .map_err(|_| SandboxError::Escapes(requested.to_string()))?
    } else {
        requested_path
    };

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    return Err(SandboxError::Escapes(requested.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SandboxError::Invalid(requested.to_string()));
            }
        }
    }
    Ok(resolved)
}

/// `path` relative to `root` when it lies under it, as given otherwise.
pub fn relative_to_root(root: &Path, path: &str) -> String {
    Path::new(path)
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_is_joined() {
        let root = Path::new("/work/example");
        assert_eq!(
            resolve_within(root, "app/src/Main.kt").unwrap(),
            PathBuf::from("/work/example/app/src/Main.kt")
        );
        assert_eq!(
            resolve_within(root, "./app/../app/Main.kt").unwrap(),
            PathBuf::from("/work/example/app/Main.kt")
        );
        assert_eq!(resolve_within(root, "").unwrap(), PathBuf::from("/work/example"));
    }

    #[test]
    fn test_absolute_path_under_root() {
        let root = Path::new("/work/example");
        assert_eq!(
            resolve_within(root, "/work/example/app/Main.kt").unwrap(),
            PathBuf::from("/work/example/app/Main.kt")
        );
    }

    #[test]
    fn test_escaping_paths_are_rejected() {
        let root = Path::new("/work/example");
        assert_eq!(
            resolve_within(root, "../secrets"),
            Err(SandboxError::Escapes("../secrets".to_string()))
        );
        assert!(resolve_within(root, "app/../../x").is_err());
        assert!(resolve_within(root, "/etc/passwd").is_err());
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/work/example");
        assert_eq!(relative_to_root(root, "/work/example/app/A.kt"), "app/A.kt");
        assert_eq!(relative_to_root(root, "app/A.kt"), "app/A.kt");
    }
}
