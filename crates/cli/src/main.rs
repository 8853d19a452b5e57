//! CodeClaw CLI — the main entry point.
//!
//! Without `--prompt` it starts an interactive session; with it, runs one
//! request headlessly and exits.

use clap::Parser;
use codeclaw_core::mode::Mode;
use std::path::PathBuf;

mod commands;
mod confirm;
mod input;
mod plan;
mod render;

#[derive(Parser)]
#[command(
    name = "codeclaw",
    about = "CodeClaw — a terminal coding assistant powered by Devstral",
    version,
    author
)]
struct Cli {
    /// Working directory for the session
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Mistral API key (overrides config and environment)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Starting mode: auto-accept-off, auto-accept-on or plan
    #[arg(long)]
    mode: Option<Mode>,

    /// Run a single prompt headlessly and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so chat output on stdout stays clean
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .map_err(|e| format!("Cannot change directory to {}: {e}", dir.display()))?;
    }

    let options = commands::agent::SessionOptions {
        api_key: cli.api_key,
        model: cli.model,
        mode: cli.mode,
    };

    match cli.prompt {
        Some(prompt) => commands::agent::run_headless(options, &prompt).await,
        None => commands::agent::run_interactive(options).await,
    }
}
