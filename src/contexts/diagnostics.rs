use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::data::BuildDiagnostic;

const GRADLE_BANNER: &str = "Build failed with an exception";
const TRUNCATE_THRESHOLD: usize = 2000;
const TRUNCATE_KEEP: usize = 1000;

fn kotlin_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)e: file://(.*?):(\d+):(\d+) ([^\r\n]*)").expect("valid regex")
    })
}

fn located_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)(?:error:|FAILURE:|Error:)\s*(.*?):(\d+):\s*([^\r\n]*)")
            .expect("valid regex")
    })
}

fn bare_error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:error:|FAILURE:|Error:)\s*([^\r\n]*)").expect("valid regex"))
}

fn gradle_failure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)FAILURE: Build failed with an exception\.\s*\* What went wrong:\s*(.*?)(?:\n\n|\n\*|$)",
        )
        .expect("valid regex")
    })
}

/// Extracts diagnostics from build output.
///
/// Kotlin compiler lines (`e: file://<path>:<line>:<col> <message>`) are
/// taken first. Only when there are none, both looser `error:` patterns run
/// and their matches add up, so a located error also yields a bare one. The Gradle "What went wrong"
/// summary is added last unless a diagnostic already mentions
/// "Build failed".
pub fn parse_build_errors(output: &str) -> Vec<BuildDiagnostic> {
    let mut errors: Vec<BuildDiagnostic> = kotlin_error_regex()
        .captures_iter(output)
        .map(|c| BuildDiagnostic {
            file: Some(c[1].to_string()),
            line: c[2].parse().ok(),
            column: c[3].parse().ok(),
            message: c[4].trim().to_string(),
        })
        .collect();

    if errors.is_empty() {
        errors.extend(
            located_error_regex()
                .captures_iter(output)
                .filter(|c| !c[1].starts_with(GRADLE_BANNER))
                .map(|c| BuildDiagnostic {
                    file: Some(c[1].trim().to_string()),
                    line: c[2].parse().ok(),
                    column: None,
                    message: c[3].trim().to_string(),
                }),
        );
        errors.extend(
            bare_error_regex()
                .captures_iter(output)
                .filter(|c| !c[1].starts_with(GRADLE_BANNER))
                .map(|c| BuildDiagnostic::general(c[1].trim()))
                .filter(|d| !d.message.is_empty()),
        );
    }

    if let Some(summary) = gradle_failure(output) {
        if !errors.iter().any(|e| e.message.contains("Build failed")) {
            errors.push(BuildDiagnostic::general(format!("Gradle build failed: {}", summary)));
        }
    }

    errors
}

fn gradle_failure(output: &str) -> Option<&str> {
    gradle_failure_regex()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Compresses build output for the model: deduplicated compiler errors and
/// the Gradle summary when present, otherwise the raw output, cut in the
/// middle when it is long.
pub fn simplify_build_output(output: &str) -> String {
    let mut simplified = String::new();

    let mut kotlin_errors: Vec<String> = Vec::new();
    for c in kotlin_error_regex().captures_iter(output) {
        let file_name = Path::new(&c[1])
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| c[1].to_string());
        let line = format!("- {}: {}", file_name, c[4].trim());
        if !kotlin_errors.contains(&line) {
            kotlin_errors.push(line);
        }
    }

    if !kotlin_errors.is_empty() {
        simplified.push_str("KOTLIN COMPILATION ERRORS:\n");
        for line in &kotlin_errors {
            simplified.push_str(line);
            simplified.push('\n');
        }
        simplified.push('\n');
    }

    if let Some(summary) = gradle_failure(output) {
        simplified.push_str(&format!("GRADLE ERRORS:\n{}\n\n", summary));
    }

    if simplified.is_empty() {
        return truncate_middle(output);
    }
    simplified
}

fn truncate_middle(output: &str) -> String {
    let chars = output.chars().count();
    if chars <= TRUNCATE_THRESHOLD {
        return output.to_string();
    }
    let head: String = output.chars().take(TRUNCATE_KEEP).collect();
    let tail: String = output.chars().skip(chars - TRUNCATE_KEEP).collect();
    format!("{}\n...\n{}", head, tail)
}

/// The message appended to the fix conversation after each build.
pub fn build_summary_message(output: &str, error_count: usize) -> String {
    format!(
        "Compilation results:\n\n{}\n\nErrors found: {}",
        simplify_build_output(output),
        error_count
    )
}
