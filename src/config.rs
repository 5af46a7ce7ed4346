//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.classinsight.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::GradingPolicy;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".classinsight.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Grading scale settings.
    #[serde(default)]
    pub grading: GradingConfig,

    /// Roster summary settings.
    #[serde(default)]
    pub roster: RosterConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Path of the SQLite database holding saved analyses.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Path of the JSON school dataset.
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,

    /// User on whose behalf analyses are generated and saved.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            dataset: default_dataset(),
            user_id: default_user_id(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("classinsight.db")
}

fn default_dataset() -> PathBuf {
    PathBuf::from("school.json")
}

fn default_user_id() -> i64 {
    1
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Longest prompt, in characters, that will be sent.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    60
}

fn default_max_prompt_chars() -> usize {
    48_000
}

/// Grading scale. Scores run from 0 to `max_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Highest valid score.
    #[serde(default = "default_max_score")]
    pub max_score: f64,

    /// A student passes when their mean is at or above this value.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            max_score: default_max_score(),
            pass_threshold: default_pass_threshold(),
        }
    }
}

impl From<&GradingConfig> for GradingPolicy {
    fn from(config: &GradingConfig) -> Self {
        Self {
            max_score: config.max_score,
            pass_threshold: config.pass_threshold,
        }
    }
}

fn default_max_score() -> f64 {
    100.0
}

fn default_pass_threshold() -> f64 {
    60.0
}

/// Roster summary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Number of classes included in the roster summary.
    #[serde(default = "default_max_classes")]
    pub max_classes: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            max_classes: default_max_classes(),
        }
    }
}

fn default_max_classes() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check that the grading scale is usable.
    pub fn validate(&self) -> Result<()> {
        if self.model.timeout_seconds == 0 {
            anyhow::bail!("model.timeout_seconds must be at least 1");
        }
        if self.model.max_prompt_chars == 0 {
            anyhow::bail!("model.max_prompt_chars must be at least 1");
        }
        if self.grading.max_score <= 0.0 {
            anyhow::bail!("grading.max_score must be positive");
        }
        if !(0.0..=self.grading.max_score).contains(&self.grading.pass_threshold) {
            anyhow::bail!(
                "grading.pass_threshold must lie between 0 and {}",
                self.grading.max_score
            );
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dataset) = args.dataset {
            self.general.dataset = dataset.clone();
        }
        if let Some(ref database) = args.database {
            self.general.database = database.clone();
        }
        if let Some(user) = args.user {
            self.general.user_id = user;
        }

        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
