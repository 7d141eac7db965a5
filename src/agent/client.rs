//! HTTP client for the Ollama API.
//!
//! Only the two endpoints the agent needs are wrapped: `/api/chat` for
//! non-streaming chat completions with tools, and `/api/tags` for the
//! startup reachability check.

use crate::agent::AgentConfig;
use crate::models::{ChatMessage, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors talking to the inference backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Cannot connect to Ollama at {url}. Is Ollama running?")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Ollama API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse Ollama response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: &'a [ToolDefinition],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Ollama `/api/tags` response.
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// Client bound to one Ollama server and one model.
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    model_name: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    /// Create a client from the agent configuration.
    pub fn new(config: &AgentConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            http_client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the conversation and tool schemas, returning the assistant message.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, ClientError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model: &self.model_name,
            messages,
            tools,
            stream: false,
            options: self
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        debug!(
            "Sending chat request with {} messages and {} tools",
            messages.len(),
            tools.len()
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        let chat_response: OllamaChatResponse =
            response.json().await.map_err(ClientError::Decode)?;

        Ok(chat_response.message)
    }

    /// Names of the models available on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(ClientError::Decode)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn classify(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(e)
        } else if e.is_connect() {
            ClientError::Connect {
                url: self.base_url.clone(),
                source: e,
            }
        } else {
            ClientError::Request(e)
        }
    }
}

/// Whether `model` is among `available`, treating an untagged name as `:latest`.
pub fn has_model(available: &[String], model: &str) -> bool {
    available.iter().any(|name| {
        name == model || (!model.contains(':') && *name == format!("{}:latest", model))
    })
}
