//! Interactive agent loop.
//!
//! Reads a user turn, sends the whole conversation to the model, runs any
//! tool calls it asks for and feeds the results straight back to the model
//! before prompting the user again.

use crate::agent::client::{ClientError, OllamaClient};
use crate::agent::tools::ToolExecutor;
use crate::models::{ChatMessage, Conversation, FunctionCall, ToolCall, ToolDefinition};
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    /// Sampling temperature; the model's own default when unset.
    pub temperature: Option<f32>,
    /// HTTP timeout per request; requests wait indefinitely when unset.
    pub timeout_seconds: Option<u64>,
    /// Leading system turn for the conversation.
    pub system_prompt: Option<String>,
    /// Show a spinner while the model is thinking.
    pub show_spinner: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "qwen3:8b".to_string(),
            temperature: None,
            timeout_seconds: None,
            system_prompt: None,
            show_spinner: true,
        }
    }
}

/// What the loop does after a model turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered without tool calls, or inference failed.
    AwaitUser,
    /// Tool results were appended; the model should see them next.
    ToolsExecuted,
}

/// The chat agent.
pub struct ChatAgent {
    config: AgentConfig,
    client: OllamaClient,
    tool_executor: ToolExecutor,
    tool_definitions: Vec<ToolDefinition>,
    conversation: Conversation,
}

impl ChatAgent {
    /// Create a new agent. The tool set is fixed from here on.
    pub fn new(config: AgentConfig, tool_executor: ToolExecutor) -> Result<Self, ClientError> {
        info!(
            "Initializing agent with model {} in {}",
            config.model_name,
            tool_executor.workspace().root().display()
        );

        let client = OllamaClient::new(&config)?;
        let tool_definitions = tool_executor.definitions();
        let conversation = match &config.system_prompt {
            Some(prompt) => Conversation::with_system_prompt(prompt.clone()),
            None => Conversation::new(),
        };

        Ok(Self {
            config,
            client,
            tool_executor,
            tool_definitions,
            conversation,
        })
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run the chat until end of input or Ctrl-C.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(
            out,
            "Chat with Ollama (model: {}). Use 'ctrl-c' or 'ctrl-d' to quit.",
            self.config.model_name
        )?;

        let mut lines = input.lines();
        let mut needs_user_input = true;

        loop {
            if needs_user_input {
                write!(out, "{}: ", style("You").blue())?;
                out.flush()?;

                let line = tokio::select! {
                    line = lines.next_line() => line?,
                    _ = tokio::signal::ctrl_c() => None,
                };

                let Some(line) = line else {
                    break;
                };

                if line.trim().is_empty() {
                    continue;
                }

                self.conversation.push(ChatMessage::user(line));
            }

            let outcome = tokio::select! {
                outcome = self.step(out) => Some(outcome?),
                _ = tokio::signal::ctrl_c() => None,
            };

            match outcome {
                Some(outcome) => needs_user_input = outcome == TurnOutcome::AwaitUser,
                None => break,
            }
        }

        writeln!(out, "\n{}", style("Exiting chat.").yellow())?;
        if self.conversation.is_empty() {
            debug!("Chat ended before any message was sent");
        } else {
            info!("Chat ended after {} messages", self.conversation.len());
        }
        Ok(())
    }

    /// One model turn: inference, then any requested tool calls.
    pub async fn step<W: Write>(&mut self, out: &mut W) -> Result<TurnOutcome> {
        debug!(
            "Sending conversation with {} messages",
            self.conversation.len()
        );

        let spinner = self.start_spinner();
        let response = self
            .client
            .chat(self.conversation.messages(), &self.tool_definitions)
            .await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let message = match response {
            Ok(message) => message,
            Err(e) => {
                error!("Inference failed: {}", e);
                writeln!(out, "{}", style(format!("Ollama API Error: {}", e)).red())?;
                return Ok(TurnOutcome::AwaitUser);
            }
        };

        if let Some(thinking) = message.thinking.as_deref() {
            debug!("Model thinking: {}", thinking.trim());
        }

        let text = message.content.trim();
        if !text.is_empty() {
            writeln!(out, "{}: {}", style("Assistant").yellow(), text)?;
        }

        let tool_calls = message.requested_tool_calls().to_vec();
        self.conversation.push(message);

        if tool_calls.is_empty() {
            return Ok(TurnOutcome::AwaitUser);
        }

        for tool_call in &tool_calls {
            let result = self.run_tool_call(tool_call, out)?;
            self.conversation.push(result);
        }

        Ok(TurnOutcome::ToolsExecuted)
    }

    /// Execute one tool call and build the tool turn for it.
    fn run_tool_call<W: Write>(
        &self,
        tool_call: &ToolCall,
        out: &mut W,
    ) -> io::Result<ChatMessage> {
        let name = &tool_call.function.name;
        let raw = &tool_call.function.arguments;

        let Some(arguments) = normalize_arguments(raw) else {
            let message = format!(
                "Tool arguments for '{}' are not in the expected dictionary format.",
                name
            );
            let received = match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            warn!("{} Received arguments: {}", message, received);
            writeln!(
                out,
                "{}",
                style(format!("{} Received arguments: {}", message, received)).red()
            )?;

            let content = json!({ "error": message, "received_arguments": received });
            return Ok(ChatMessage::tool(name.as_str(), content.to_string()));
        };

        writeln!(out, "{}: {}({})", style("tool_call").green(), name, arguments)?;

        let call = ToolCall {
            function: FunctionCall {
                name: name.clone(),
                arguments,
            },
        };
        let result = self.tool_executor.execute(&call);
        if !result.success {
            debug!("Tool {} failed: {:?}", name, result.error);
        }

        let content = result.content();
        writeln!(out, "{}: {}", style("tool_result").green(), content)?;
        info!("Tool {} executed", name);

        Ok(ChatMessage::tool(name.as_str(), content))
    }

    fn start_spinner(&self) -> Option<ProgressBar> {
        if !self.config.show_spinner {
            return None;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }
}

/// Coerce tool-call arguments into a JSON object.
///
/// Missing arguments become `{}`; a string holding a JSON object is parsed.
fn normalize_arguments(raw: &Value) -> Option<Value> {
    match raw {
        Value::Object(_) => Some(raw.clone()),
        Value::Null => Some(json!({})),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_object),
        _ => None,
    }
}
