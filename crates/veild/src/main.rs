//! Veil Daemon - privacy sanitizer in front of a local Ollama model
//!
//! Serves `/sanitize` over HTTP, or sanitizes a single text with `veild once`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use veil_common::{Config, OllamaClient, VERSION};
use veild::cli::{Cli, Commands};
use veild::pipeline;
use veild::server::{self, AppState};
use veild::supervisor::OllamaSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref());

    match cli.command() {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Once { text } => once(config, text).await,
    }
}

fn build_state(config: Config) -> Result<AppState> {
    let supervisor = Arc::new(OllamaSupervisor::new(config.ollama.clone())?);
    let backend = Arc::new(OllamaClient::new(&config.ollama));
    info!("Using model {} at {}", backend.model(), config.ollama.base_url);
    Ok(AppState::new(config, backend, supervisor))
}

async fn serve(config: Config) -> Result<()> {
    info!("Veil Daemon v{} starting", VERSION);

    let state = build_state(config)?;

    if state.config.ollama.auto_start && !state.supervisor.ensure_running().await {
        warn!("Ollama is not available yet; requests will retry the probe");
    }

    server::run(state).await
}

async fn once(config: Config, text: Option<String>) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            eprint!("Enter your prompt: ");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read prompt from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if text.trim().is_empty() {
        anyhow::bail!("No text provided");
    }

    let state = build_state(config)?;
    let outcome = pipeline::sanitize(&state, &text).await;
    state.supervisor.stop().await;

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
