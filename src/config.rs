//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ollama-agent.toml` files.

use crate::agent::AgentConfig;
use crate::cli::normalize_ollama_url;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".ollama-agent.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent behaviour settings.
    #[serde(default)]
    pub agent: AgentSettings,
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

    /// Temperature for generation. Unset means the model default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Request timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: None,
            timeout_seconds: None,
        }
    }
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Agent behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Optional system prompt for every conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Show a spinner while waiting for the model.
    #[serde(default = "default_true")]
    pub show_spinner: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            show_spinner: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.ollama-agent.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if args.temperature.is_some() {
            self.model.temperature = args.temperature;
        }
        if args.timeout.is_some() {
            self.model.timeout_seconds = args.timeout;
        }
        if let Some(ref prompt) = args.system_prompt {
            self.agent.system_prompt = Some(prompt.clone());
        }

        // Flags always override
        if args.no_spinner || args.quiet {
            self.agent.show_spinner = false;
        }
    }

    /// Build the runtime agent configuration.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            ollama_url: normalize_ollama_url(&self.model.ollama_url),
            model_name: self.model.name.clone(),
            temperature: self.model.temperature,
            timeout_seconds: self.model.timeout_seconds,
            system_prompt: self
                .agent
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            show_spinner: self.agent.show_spinner,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
