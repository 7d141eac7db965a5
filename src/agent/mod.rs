//! LLM agent modules for the interactive chat.
//!
//! This module provides the Ollama client, the file tools and the
//! turn-taking loop that ties them together.

pub mod agent_loop;
pub mod client;
pub mod tools;

pub use agent_loop::{AgentConfig, ChatAgent};
pub use client::has_model;
pub use tools::ToolExecutor;
