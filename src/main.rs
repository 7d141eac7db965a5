//! Ollama Agent - interactive chat with a local model that can use file tools
//!
//! A CLI that connects an Ollama model to `read_file`, `list_files` and
//! `edit_file`, all confined to the current working directory.
//!
//! Exit codes:
//!   0 - Chat ended normally (end of input or Ctrl-C)
//!   1 - Startup error (bad arguments, config, Ollama unreachable, etc.)

mod agent;
mod cli;
mod config;
mod models;
mod workspace;

use agent::client::OllamaClient;
use agent::{ChatAgent, ToolExecutor};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use console::style;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workspace::Workspace;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Ollama Agent v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // The stdin reader may still be parked on a read, so leave without
    // waiting for the runtime to shut down.
    match run_chat(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Agent failed: {:#}", e);
            eprintln!("{}", style(format!("Error: {:#}", e)).red());
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ollama-agent.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, Ollama URL and system prompt.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Connect to Ollama and run the interactive chat.
async fn run_chat(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let agent_config = config.agent_config();

    let workspace = Workspace::current().context("Failed to resolve the working directory")?;
    info!("Tools confined to {}", workspace.root().display());

    let tool_executor = ToolExecutor::with_builtin_tools(workspace);
    let mut agent = ChatAgent::new(agent_config, tool_executor)?;

    check_backend(agent.client()).await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    agent.run(stdin, &mut stdout).await
}

/// Verify Ollama is reachable and report which model the chat will use.
async fn check_backend(client: &OllamaClient) -> Result<()> {
    let models = client.list_models().await.context(
        "Could not connect to the Ollama server. Please ensure it is running and accessible",
    )?;

    println!(
        "{}",
        style("Successfully connected to Ollama server.").green()
    );
    if !agent::has_model(&models, client.model_name()) {
        warn!(
            "Model '{}' not found on {} (available: {})",
            client.model_name(),
            client.base_url(),
            models.join(", ")
        );
    }

    println!(
        "{}",
        style(format!("Using Ollama model: {}", client.model_name())).blue()
    );
    println!(
        "{}",
        style(format!(
            "Make sure '{0}' is pulled ('ollama pull {0}') and supports tool calling.",
            client.model_name()
        ))
        .blue()
    );
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
