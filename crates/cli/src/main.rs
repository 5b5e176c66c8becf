//! Parley CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway
//! - `chat`  — Interactive chat or single-message mode
//! - `tools` — List the tool catalogue

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley — chat agent for the document extraction service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = "parley.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },

    /// List the registered tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = parley_config::AppConfig::load(&cli.config)
        .map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Chat {
            message,
            conversation,
        } => commands::chat::run(config, message, conversation).await?,
        Commands::Tools => commands::tools::run(config)?,
    }

    Ok(())
}
