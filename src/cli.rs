//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Every flag is optional: with none given the
//! agent talks to a local Ollama with the default model.

use clap::Parser;
use std::path::PathBuf;

/// Ollama Agent - chat with a local model that can read and edit your files
///
/// The model may list, read, create and edit files inside the current
/// working directory. Nothing outside it is reachable.
///
/// Examples:
///   ollama-agent
///   ollama-agent --model llama3.1
///   ollama-agent --ollama-url http://gpu-box:11434 --timeout 600
///   ollama-agent --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Ollama model to chat with (must support tool calling)
    ///
    /// Overrides the model in .ollama-agent.toml. Default: qwen3:8b.
    #[arg(short, long, env = "OLLAMA_AGENT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    ///
    /// Accepts the same forms as OLLAMA_HOST: a bare `host` or `host:port`
    /// gets `http://` and port 11434 filled in.
    #[arg(long, value_name = "URL", env = "OLLAMA_HOST")]
    pub ollama_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ollama-agent.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sampling temperature (0.0 - 2.0)
    ///
    /// Leave unset to use the model's own default.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    ///
    /// By default requests wait for the model indefinitely.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// System prompt placed at the start of the conversation
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Do not show a spinner while waiting for the model
    #[arg(long)]
    pub no_spinner: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ollama-agent.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            let url = normalize_ollama_url(url);
            let host = url
                .strip_prefix("http://")
                .or_else(|| url.strip_prefix("https://"));
            match host {
                Some(host) if !host.is_empty() => {}
                _ => {
                    return Err("Ollama URL must start with 'http://' or 'https://'".to_string())
                }
            }
        }

        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err("Model name cannot be empty".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// Defaults to WARN so log lines stay out of the conversation.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }
}

/// Default port of the Ollama server.
const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Turn an `OLLAMA_HOST`-style value into a full base URL.
///
/// A value without a scheme is taken as `http`, and a missing port defaults
/// to 11434. Values that carry a scheme keep their own default port.
pub fn normalize_ollama_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        return trimmed.to_string();
    }

    let (authority, path) = match trimmed.find('/') {
        Some(i) => trimmed.split_at(i),
        None => (trimmed, ""),
    };

    // IPv6 literals carry colons inside the brackets.
    let port_part = match authority.rfind(']') {
        Some(i) => &authority[i..],
        None => authority,
    };

    if authority.is_empty() || port_part.contains(':') {
        format!("http://{}{}", authority, path)
    } else {
        format!("http://{}:{}{}", authority, DEFAULT_OLLAMA_PORT, path)
    }
}
