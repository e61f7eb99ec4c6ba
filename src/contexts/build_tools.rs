use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::build_runner::BuildRunner;
use super::sandbox::resolve_within;
use crate::model::{ToolCall, ToolDefinition};

/// Result of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text returned to the model
    pub content: String,
    /// Project-relative path written by a successful `write_file`
    pub written: Option<String>,
}

impl ToolOutcome {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            written: None,
        }
    }
}

#[derive(Deserialize)]
struct ReadFileArgs {
    file_path: String,
}

#[derive(Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    directory: String,
}

/// Tools the fix agent exposes to the model. All paths are confined to the
/// project directory and every failure is returned as text.
pub struct BuildTools {
    project_dir: PathBuf,
    runner: Arc<dyn BuildRunner>,
}

impl BuildTools {
    pub fn new(project_dir: PathBuf, runner: Arc<dyn BuildRunner>) -> Self {
        Self {
            project_dir,
            runner,
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "run_build".to_string(),
                description: "Compiles the Android test sources of the project and returns the \
                    build output. Use it to check a fix and to get the remaining compilation errors."
                    .to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            ToolDefinition {
                name: "read_file".to_string(),
                description: "Reads the contents of a file. The path must be relative to the \
                    project directory."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path relative to the project directory"}
                    },
                    "required": ["file_path"]
                }),
            },
            ToolDefinition {
                name: "write_file".to_string(),
                description: "Replaces the contents of a file. The path must be relative to the \
                    project directory. Always pass the complete file content."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path relative to the project directory"},
                        "content": {"type": "string", "description": "Complete new file content"}
                    },
                    "required": ["file_path", "content"]
                }),
            },
            ToolDefinition {
                name: "list_files".to_string(),
                description: "Lists the entries of a directory relative to the project root; \
                    directories end with '/'. Without a directory, lists the project root."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "directory": {"type": "string", "description": "Directory relative to the project root"}
                    }
                }),
            },
        ]
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        tracing::debug!(tool = %call.name, "tool call");
        match call.name.as_str() {
            "run_build" => ToolOutcome::text(self.runner.run().await),
            "read_file" => match parse_args::<ReadFileArgs>(call) {
                Ok(args) => ToolOutcome::text(self.read_file(&args.file_path)),
                Err(e) => ToolOutcome::text(e),
            },
            "write_file" => match parse_args::<WriteFileArgs>(call) {
                Ok(args) => self.write_file(&args.file_path, &args.content),
                Err(e) => ToolOutcome::text(e),
            },
            "list_files" => match parse_args::<ListFilesArgs>(call) {
                Ok(args) => ToolOutcome::text(self.list_files(&args.directory)),
                Err(e) => ToolOutcome::text(e),
            },
            other => ToolOutcome::text(format!("Unknown tool: {}", other)),
        }
    }

    fn read_file(&self, file_path: &str) -> String {
        let path = match resolve_within(&self.project_dir, file_path) {
            Ok(path) => path,
            Err(e) => return e.to_string(),
        };
        fs::read_to_string(&path).unwrap_or_else(|e| format!("Cannot read {}: {}", file_path, e))
    }

    fn write_file(&self, file_path: &str, content: &str) -> ToolOutcome {
        let path = match resolve_within(&self.project_dir, file_path) {
            Ok(path) => path,
            Err(e) => return ToolOutcome::text(e.to_string()),
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return ToolOutcome::text(format!("Cannot create {}: {}", parent.display(), e));
            }
        }
        match fs::write(&path, content) {
            Ok(()) => {
                tracing::info!(path = %file_path, "file written by fix agent");
                ToolOutcome {
                    content: format!("File {} updated!", file_path),
                    written: Some(file_path.to_string()),
                }
            }
            Err(e) => ToolOutcome::text(format!("Cannot write {}: {}", file_path, e)),
        }
    }

    fn list_files(&self, directory: &str) -> String {
        let dir = match resolve_within(&self.project_dir, directory) {
            Ok(dir) => dir,
            Err(e) => return e.to_string(),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => return format!("Cannot list {}: {}", directory, e),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    format!("{}/", name)
                } else {
                    name
                }
            })
            .collect();
        names.sort();
        names.join("\n")
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(call: &ToolCall) -> Result<T, String> {
    serde_json::from_value(call.arguments.clone())
        .map_err(|e| format!("Invalid arguments for {}: {}", call.name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedBuild;

    #[async_trait]
    impl BuildRunner for FixedBuild {
        async fn run(&self) -> String {
            "BUILD SUCCESSFUL in 1s".to_string()
        }
    }

    fn tools(dir: &std::path::Path) -> BuildTools {
        BuildTools::new(dir.to_path_buf(), Arc::new(FixedBuild))
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(dir.path());

        let written = tools
            .execute(&call("write_file", json!({"file_path": "app/A.kt", "content": "class A"})))
            .await;
        assert_eq!(written.content, "File app/A.kt updated!");
        assert_eq!(written.written.as_deref(), Some("app/A.kt"));

        let read = tools.execute(&call("read_file", json!({"file_path": "app/A.kt"}))).await;
        assert_eq!(read.content, "class A");
        assert_eq!(read.written, None);
    }

    #[tokio::test]
    async fn test_list_files_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("gradlew"), "").unwrap();
        let tools = tools(dir.path());

        let listed = tools.execute(&call("list_files", json!({}))).await;
        assert_eq!(listed.content, "app/\ngradlew");
    }

    #[tokio::test]
    async fn test_failures_are_text() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(dir.path());

        let missing = tools.execute(&call("read_file", json!({"file_path": "nope.kt"}))).await;
        assert!(missing.content.starts_with("Cannot read nope.kt"));

        let escaping = tools
            .execute(&call("write_file", json!({"file_path": "../x.kt", "content": ""})))
            .await;
        assert!(escaping.content.contains("outside the project directory"));
        assert_eq!(escaping.written, None);

        let bad_args = tools.execute(&call("read_file", json!({}))).await;
        assert!(bad_args.content.starts_with("Invalid arguments for read_file"));

        let unknown = tools.execute(&call("delete_file", json!({}))).await;
        assert_eq!(unknown.content, "Unknown tool: delete_file");
    }

    #[tokio::test]
    async fn test_run_build_uses_runner() {
        let dir = tempfile::tempdir().unwrap();
        let result = tools(dir.path()).execute(&call("run_build", json!({}))).await;
        assert_eq!(result.content, "BUILD SUCCESSFUL in 1s");
    }
}
