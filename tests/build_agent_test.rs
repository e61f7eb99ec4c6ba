mod common;

use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{FakeBuild, ScriptedModel, text, tool_call};
use verter::contexts::{BuildFixAgent, FixOutcome, FixStatus, FixedFile};
use verter::model::Message;

const SUCCESS: &str = "BUILD SUCCESSFUL in 4s\n12 actionable tasks: 2 executed, 10 up-to-date";

fn agent(
    project_dir: &Path,
    model: Arc<ScriptedModel>,
    build: Arc<FakeBuild>,
    max_steps: usize,
) -> BuildFixAgent {
    BuildFixAgent::new(
        project_dir.to_path_buf(),
        model,
        build,
        "You fix builds.".to_string(),
        "BUILD SUCCESSFUL".to_string(),
        max_steps,
    )
}

fn kotlin_error(project_dir: &Path, file: &str, message: &str) -> String {
    format!(
        "> Task :app:compileDebugAndroidTestKotlin FAILED\ne: file://{}/{}:3:9 {}\n\nBUILD FAILED in 2s\n",
        project_dir.display(),
        file,
        message
    )
}

#[tokio::test]
async fn successful_build_is_fixed_without_asking_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(ScriptedModel::new(Vec::new()));
    let build = Arc::new(FakeBuild::new(vec![SUCCESS.to_string()]));

    let session = agent(dir.path(), model.clone(), build.clone(), 100)
        .build_and_fix()
        .await
        .unwrap();

    assert_eq!(session.outcome, FixOutcome::Fixed);
    assert_eq!(session.state.status, FixStatus::Fixed);
    assert_eq!(session.steps, 1);
    assert_eq!(build.runs(), 1);
    assert!(model.requests().is_empty());
    assert!(session.state.files_fixed.is_empty());
}

#[tokio::test]
async fn fixes_the_reported_file_and_rebuilds() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/TasksActions.kt"), "class TasksActions { fun add() = foo() }").unwrap();

    let model = Arc::new(ScriptedModel::new(vec![
        tool_call(
            "write_file",
            json!({"file_path": "app/TasksActions.kt", "content": "class TasksActions { fun add() = Unit }"}),
        ),
        text("Replaced the unresolved call."),
    ]));
    let build = Arc::new(FakeBuild::new(vec![
        kotlin_error(dir.path(), "app/TasksActions.kt", "Unresolved reference: foo"),
        SUCCESS.to_string(),
    ]));

    let session = agent(dir.path(), model.clone(), build.clone(), 100)
        .build_and_fix()
        .await
        .unwrap();

    assert_eq!(session.outcome, FixOutcome::Fixed);
    // run_build, fix_errors, tools, fix_errors, run_build
    assert_eq!(session.steps, 5);
    assert_eq!(build.runs(), 2);
    assert_eq!(session.state.files_examined, vec!["app/TasksActions.kt".to_string()]);
    assert_eq!(
        session.state.files_fixed,
        vec![FixedFile {
            path: "app/TasksActions.kt".to_string(),
            description: "Fix for: Unresolved reference: foo".to_string(),
        }]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("app/TasksActions.kt")).unwrap(),
        "class TasksActions { fun add() = Unit }"
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 4);
    let contents: Vec<&str> = requests[0].messages.iter().map(Message::content).collect();
    assert_eq!(contents[0], "You fix builds.");
    assert!(contents[1].starts_with("Compilation results:\n\nKOTLIN COMPILATION ERRORS:\n- TasksActions.kt: Unresolved reference: foo"));
    assert!(contents[1].ends_with("Errors found: 1"));
    assert!(contents[2].starts_with("The following error needs to be corrected:\n{"));
    assert!(contents[3].starts_with("File content app/TasksActions.kt:\n\n```kotlin\nclass TasksActions"));

    // The tool result is part of the second request.
    assert!(requests[1]
        .messages
        .iter()
        .any(|m| matches!(m, Message::Tool { content, .. } if content == "File app/TasksActions.kt updated!")));
}

#[tokio::test]
async fn stops_at_the_step_limit() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(ScriptedModel::repeating(tool_call("list_files", json!({}))));
    let build = Arc::new(FakeBuild::new(vec![kotlin_error(
        dir.path(),
        "app/Missing.kt",
        "Unresolved reference: UiDevice",
    )]));

    let session = agent(dir.path(), model.clone(), build, 7)
        .build_and_fix()
        .await
        .unwrap();

    assert_eq!(session.outcome, FixOutcome::StepLimitReached);
    assert_eq!(session.state.status, FixStatus::MaxAttemptsReached);
    assert_eq!(session.steps, 7);
    assert_eq!(model.requests().len(), 3);
    assert!(session
        .state
        .messages
        .iter()
        .any(|m| m.content() == "File app/Missing.kt not found."));

    let report = session.report();
    assert_eq!(report.remaining_errors.len(), 1);
    assert_eq!(report.remaining_errors[0].message, "Unresolved reference: UiDevice");
}

#[tokio::test]
async fn failed_build_without_diagnostics_ends_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(ScriptedModel::new(Vec::new()));
    let build = Arc::new(FakeBuild::new(vec!["Starting a Gradle Daemon\nBUILD FAILED in 1s".to_string()]));

    let session = agent(dir.path(), model.clone(), build, 100)
        .build_and_fix()
        .await
        .unwrap();

    assert_eq!(session.outcome, FixOutcome::NoActionableDiagnostics);
    assert_eq!(session.state.status, FixStatus::Running);
    assert_eq!(session.steps, 1);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn model_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(ScriptedModel::new(Vec::new()));
    let build = Arc::new(FakeBuild::new(vec!["error: something broke\n".to_string()]));

    let result = agent(dir.path(), model, build, 100).build_and_fix().await;
    assert!(result.is_err());
}
