//! Run configuration.
//!
//! Settings are read once, from an optional YAML file, and handed to each
//! component's constructor. Nothing below the CLI looks configuration up on
//! its own.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::contexts::{ComponentLayout, SchemaViolationPolicy};

/// Configuration file picked up from the working directory when no explicit
/// path is given
pub const DEFAULT_SETTINGS_FILE: &str = "verter.yml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No API key found: set {env} or create {file}")]
    MissingApiKey { env: String, file: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    /// Root of the Android project the generated tests belong to
    pub project_dir: PathBuf,
    /// Where artifacts are written, relative to `project_dir`
    pub output_dir: PathBuf,
    /// Directory with prompt overrides; built-in prompts are used otherwise
    pub prompts_dir: Option<PathBuf>,
    pub cache: CacheSettings,
    pub build: BuildSettings,
    pub fix: FixSettings,
    pub layout: ComponentLayout,
    pub schema_violation: SchemaViolationPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            project_dir: PathBuf::from("example"),
            output_dir: PathBuf::from("app/src/androidTest/java/verterai/example"),
            prompts_dir: None,
            cache: CacheSettings::default(),
            build: BuildSettings::default(),
            fix: FixSettings::default(),
            layout: ComponentLayout::default(),
            schema_violation: SchemaViolationPolicy::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from `verter.yml` if present, or
    /// falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Absolute-or-relative directory artifacts are written to.
    pub fn artifact_root(&self) -> PathBuf {
        self.project_dir.join(&self.output_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub endpoint: String,
    pub name: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// File holding the API key, read when the variable is unset
    pub api_key_file: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1".to_string(),
            name: "claude-3-7-sonnet-latest".to_string(),
            temperature: Some(0.0),
            max_tokens: 40_000,
            request_timeout_secs: 600,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key_file: Some(PathBuf::from(".anthropic_token")),
        }
    }
}

impl ModelSettings {
    pub fn resolve_api_key(&self) -> Result<String, SettingsError> {
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }
        if let Some(file) = &self.api_key_file {
            if let Ok(key) = fs::read_to_string(file) {
                if !key.trim().is_empty() {
                    return Ok(key.trim().to_string());
                }
            }
        }
        Err(SettingsError::MissingApiKey {
            env: self.api_key_env.clone(),
            file: self
                .api_key_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "a key file".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(crate::contexts::DEFAULT_CACHE_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Build executable; a relative path containing `/` is resolved against
    /// the project directory
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Text whose presence in the build output means the build passed
    pub success_marker: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            program: "./gradlew".to_string(),
            args: vec!["compileDebugAndroidTestKotlin".to_string()],
            timeout_secs: 300,
            success_marker: "BUILD SUCCESSFUL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixSettings {
    /// Maximum number of agent steps in one fix session
    pub max_steps: usize,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self { max_steps: 100 }
    }
}
