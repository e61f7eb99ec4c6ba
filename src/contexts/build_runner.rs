use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::settings::BuildSettings;

/// Runs the project build and returns its combined output.
///
/// Never fails: a build that cannot be started or does not finish in time is
/// reported through the returned text.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn run(&self) -> String;
}

/// Runs the configured build command in the project directory.
pub struct CommandBuildRunner {
    project_dir: PathBuf,
    settings: BuildSettings,
}

impl CommandBuildRunner {
    pub fn new(project_dir: PathBuf, settings: BuildSettings) -> Self {
        Self {
            project_dir,
            settings,
        }
    }

    /// A relative program containing a path separator (`./gradlew`) is taken
    /// from the project directory; a bare name is looked up on `PATH`.
    fn program(&self) -> PathBuf {
        let program = Path::new(&self.settings.program);
        if program.is_relative() && self.settings.program.contains('/') {
            self.project_dir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    pub fn command_line(&self) -> String {
        let mut line = self.settings.program.clone();
        for arg in &self.settings.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(unix)]
fn ensure_executable(program: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::metadata(program) else {
        return;
    };
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        if let Err(e) = std::fs::set_permissions(program, permissions) {
            tracing::debug!(program = %program.display(), error = %e, "could not mark build program executable");
        }
    }
}

#[cfg(not(unix))]
fn ensure_executable(_program: &Path) {}

#[async_trait]
impl BuildRunner for CommandBuildRunner {
    async fn run(&self) -> String {
        let program = self.program();
        ensure_executable(&program);

        tracing::info!(command = %self.command_line(), dir = %self.project_dir.display(), "running build");
        let mut command = Command::new(&program);
        command
            .args(&self.settings.args)
            .current_dir(&self.project_dir)
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.settings.timeout_secs);
        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => format!(
                "{}\n{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "build could not be started");
                format!("Failed to run {}: {}", self.command_line(), e)
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.settings.timeout_secs, "build timed out");
                format!(
                    "Command '{}' timed out after {} seconds",
                    self.command_line(),
                    self.settings.timeout_secs
                )
            }
        }
    }
}
