//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Veil privacy sanitizer daemon
#[derive(Debug, Parser)]
#[command(name = "veild")]
#[command(about = "Sanitize text through a local Ollama model", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (overrides $VEIL_CONFIG and /etc/veil/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Sanitize one text and print the result as JSON
    Once {
        /// Text to sanitize; read from stdin when omitted
        text: Option<String>,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            host: None,
            port: None,
        })
    }
}
