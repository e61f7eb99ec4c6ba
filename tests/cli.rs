mod common;

use std::fs;
use std::process::Command;

use common::fixture_path;

fn verter() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_verter"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn normalize_prints_pruned_action_records() {
    let dir = tempfile::tempdir().unwrap();
    let output = verter()
        .arg("normalize")
        .arg(fixture_path("add_delete_task.json"))
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["element_name"], "Task name field");
    assert_eq!(records[0]["element_action"], "input_text");
    assert_eq!(records[0]["element_action_data"], "example");
    assert_eq!(records[2]["element_action"], "tap");

    let root = &records[0]["screen_hierarchy"][0];
    assert!(root.get("bounds").is_none());
    assert!(root.get("index").is_none());
    assert_eq!(root["class"], "android.widget.FrameLayout");
}

#[test]
fn normalize_rejects_malformed_trace() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("broken.json");
    fs::write(&trace, r#"[{"element": {"hierarchy": []}, "type": "tap"}]"#).unwrap();

    let output = verter()
        .arg("normalize")
        .arg(&trace)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid trace"));
}

#[test]
fn generate_requires_a_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let output = verter()
        .arg("generate")
        .arg("--trace")
        .arg(fixture_path("add_delete_task.json"))
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--scenario"));
}

#[test]
fn fix_dry_run_reports_the_build_command() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("settings.yml");
    fs::write(&settings, "project_dir: android\nfix:\n  max_steps: 12\n").unwrap();

    let output = verter()
        .arg("fix")
        .arg("--dry-run")
        .arg("--config")
        .arg(&settings)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[DRY RUN] Would run `./gradlew compileDebugAndroidTestKotlin` in android"));
    assert!(stdout.contains("max_steps=12"));
}
