use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use verter::contexts::FixSession;

/// Writes the conversation and report of a fix session to
/// `<project>/.verter/fix_sessions/<timestamp>/`.
pub fn write_session_log(project_root: &Path, session: &FixSession) -> Result<PathBuf> {
    let dir = create_session_dir(project_root)?;

    let transcript = serde_json::to_string_pretty(&session.state.messages)
        .context("Failed to serialize fix transcript")?;
    fs::write(dir.join("transcript.json"), transcript)
        .with_context(|| format!("Failed to write transcript in {}", dir.display()))?;

    let report =
        serde_json::to_string_pretty(&session.report()).context("Failed to serialize fix report")?;
    fs::write(dir.join("report.json"), report)
        .with_context(|| format!("Failed to write report in {}", dir.display()))?;

    fs::write(dir.join("last_build_output.txt"), &session.state.build_output).ok();

    Ok(dir)
}

fn create_session_dir(project_root: &Path) -> Result<PathBuf> {
    let base = project_root.join(".verter").join("fix_sessions");
    let ts = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let dir = base.join(ts);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}
