use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod progress;
mod session_log;

use progress::ProgressIndicator;
use session_log::write_session_log;
use verter::contexts::{
    ArtifactWriter, Automator, BuildFixAgent, CommandBuildRunner, FixOutcome, FixReport,
    normalize as normalize_frames, parse_trace,
};
use verter::data::{ActionFrame, SourceArtifact};
use verter::model::{AnthropicModel, CachedModel, ChatModel};
use verter::registries::{FilePromptRegistry, PromptSet};
use verter::settings::Settings;

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

/// Where the test scenario comes from.
pub enum ScenarioSource {
    Text(String),
    File(PathBuf),
}

impl ScenarioSource {
    pub fn from_args(text: Option<String>, file: Option<PathBuf>) -> Result<Self> {
        match (text, file) {
            (Some(text), _) => Ok(ScenarioSource::Text(text)),
            (None, Some(file)) => Ok(ScenarioSource::File(file)),
            (None, None) => anyhow::bail!("Provide the test scenario with --scenario or --scenario-file"),
        }
    }

    fn load(self) -> Result<String> {
        let scenario = match self {
            ScenarioSource::Text(text) => text,
            ScenarioSource::File(path) => fs::read_to_string(&path)
                .with_context(|| format!("Failed to read scenario {}", path.display()))?,
        };
        if scenario.trim().is_empty() {
            anyhow::bail!("Test scenario is empty");
        }
        Ok(scenario)
    }
}

pub async fn generate(
    trace_path: &Path,
    scenario: ScenarioSource,
    no_fix: bool,
    settings_path: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let scenario = scenario.load()?;
    let frames = read_trace(trace_path)?;
    let prompts = load_prompts(&settings)?;
    let model = build_model(&settings)?;

    println!(
        "Generating tests for {} recorded action(s) with {}",
        frames.len(),
        model.name()
    );
    let automator = Automator::new(
        model.clone(),
        prompts.clone(),
        settings.layout.clone(),
        settings.schema_violation,
    );
    let artifacts = automator
        .code(&scenario, &frames)
        .await
        .context("Test generation failed")?;
    println!("✓ Generated {} file(s)", artifacts.len());

    let writer = ArtifactWriter::new(settings.artifact_root());
    if config.dry_run {
        for artifact in &artifacts {
            println!("[DRY RUN] Would write {}", writer.target(artifact)?.display());
        }
        if !no_fix {
            println!("[DRY RUN] Would run the build-fix loop");
        }
        return Ok(());
    }

    write_artifacts(&writer, &artifacts)?;

    if no_fix {
        return Ok(());
    }
    run_fix_session(&settings, model, prompts.fix_build, settings.fix.max_steps, config).await
}

pub async fn fix(max_steps: Option<usize>, settings_path: Option<&Path>, config: &Config) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let max_steps = max_steps.unwrap_or(settings.fix.max_steps);
    let runner = CommandBuildRunner::new(settings.project_dir.clone(), settings.build.clone());

    if config.dry_run {
        println!(
            "[DRY RUN] Would run `{}` in {} and fix errors (max_steps={})",
            runner.command_line(),
            settings.project_dir.display(),
            max_steps
        );
        return Ok(());
    }

    let prompts = load_prompts(&settings)?;
    let model = build_model(&settings)?;
    run_fix_session(&settings, model, prompts.fix_build, max_steps, config).await
}

pub fn normalize(trace_path: &Path) -> Result<()> {
    let frames = read_trace(trace_path)?;
    let records = normalize_frames(&frames);
    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to serialize action records")?
    );
    Ok(())
}

fn read_trace(path: &Path) -> Result<Vec<ActionFrame>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    parse_trace(&content).with_context(|| format!("Invalid trace {}", path.display()))
}

fn load_prompts(settings: &Settings) -> Result<PromptSet> {
    let registry = FilePromptRegistry::new(settings.prompts_dir.clone());
    PromptSet::load(&registry).context("Failed to load prompts")
}

fn build_model(settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    let api_key = settings.model.resolve_api_key()?;
    let model: Arc<dyn ChatModel> = Arc::new(
        AnthropicModel::new(settings.model.clone(), api_key)
            .context("Failed to create model client")?,
    );
    if settings.cache.enabled {
        tracing::debug!(dir = %settings.cache.dir.display(), "model response cache enabled");
        return Ok(Arc::new(CachedModel::new(model, settings.cache.dir.clone())));
    }
    Ok(model)
}

fn write_artifacts(writer: &ArtifactWriter, artifacts: &[SourceArtifact]) -> Result<()> {
    println!("Writing files to {}", writer.root().display());
    let mut progress = ProgressIndicator::new(artifacts.len());
    for artifact in artifacts {
        match writer.write(artifact) {
            Ok(_) => progress.complete_item(&artifact.path, None),
            Err(e) => progress.complete_item(&artifact.path, Some(&e.to_string())),
        }
    }
    progress.finish();

    if progress.failed() > 0 {
        anyhow::bail!("{} file(s) could not be written", progress.failed());
    }
    Ok(())
}

async fn run_fix_session(
    settings: &Settings,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    max_steps: usize,
    config: &Config,
) -> Result<()> {
    let project_dir = std::path::absolute(&settings.project_dir)
        .with_context(|| format!("Invalid project directory {}", settings.project_dir.display()))?;
    println!(
        "Attempting to restore compilation in {} (max_steps={})...",
        project_dir.display(),
        max_steps
    );

    let runner = Arc::new(CommandBuildRunner::new(project_dir.clone(), settings.build.clone()));
    let agent = BuildFixAgent::new(
        project_dir.clone(),
        model,
        runner,
        system_prompt,
        settings.build.success_marker.clone(),
        max_steps,
    );
    let session = agent.build_and_fix().await.context("Fix session failed")?;

    match write_session_log(&project_dir, &session) {
        Ok(dir) => println!("Session log: {}", dir.display()),
        Err(e) => eprintln!("Warning: failed to write session log: {:#}", e),
    }
    if config.verbose {
        println!("Last build output:\n{}", session.state.build_output);
    }

    let report = session.report();
    print_report(&report);
    match report.outcome {
        FixOutcome::Fixed => Ok(()),
        FixOutcome::NoActionableDiagnostics => {
            anyhow::bail!("Build still failing and no actionable error was found")
        }
        FixOutcome::StepLimitReached => {
            anyhow::bail!("Build still failing after {} step(s)", report.steps)
        }
    }
}

fn print_report(report: &FixReport) {
    match report.outcome {
        FixOutcome::Fixed => println!("✓ Build successful after {} step(s)", report.steps),
        FixOutcome::NoActionableDiagnostics => {
            eprintln!("✗ Build failed without actionable diagnostics")
        }
        FixOutcome::StepLimitReached => {
            eprintln!("✗ Step limit reached ({} steps)", report.steps)
        }
    }

    if !report.files_examined.is_empty() {
        println!("Files examined:");
        for file in &report.files_examined {
            println!("  - {}", file);
        }
    }
    if !report.files_fixed.is_empty() {
        println!("Files fixed:");
        for fixed in &report.files_fixed {
            println!("  - {}: {}", fixed.path, fixed.description);
        }
    }
    if !report.remaining_errors.is_empty() {
        println!("Remaining errors:");
        for error in &report.remaining_errors {
            match (&error.file, error.line) {
                (Some(file), Some(line)) => println!("  - {}:{} {}", file, line, error.message),
                (Some(file), None) => println!("  - {} {}", file, error.message),
                _ => println!("  - {}", error.message),
            }
        }
    }
}
