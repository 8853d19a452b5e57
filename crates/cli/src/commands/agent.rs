//! Interactive and headless chat sessions.

use codeclaw_agent::{AgentOrchestrator, OrchestratorConfig, StreamingChunk};
use codeclaw_config::{AVAILABLE_MODELS, AppConfig};
use codeclaw_core::chat::ChatEntryKind;
use codeclaw_core::confirmation::{AutoApprove, ConfirmationGateway};
use codeclaw_core::mode::Mode;
use codeclaw_providers::MistralProvider;
use codeclaw_tools::{ToolSettings, default_registry};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use super::slash::{HELP, Line, SlashCommand, parse};
use crate::confirm::TerminalConfirmation;
use crate::input::LineInput;
use crate::plan;
use crate::render::ChunkRenderer;

/// Command-line overrides applied on top of the loaded config.
pub struct SessionOptions {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub mode: Option<Mode>,
}

fn load_config(options: &SessionOptions) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(key) = &options.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(model) = &options.model {
        config.default_model = model.clone();
    }
    if let Some(mode) = options.mode {
        config.agent.default_mode = mode;
    }

    // Fail early with setup instructions when no key is configured
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    CODECLAW_API_KEY=...   or   MISTRAL_API_KEY=...");
        eprintln!();
        eprintln!("  Or pass --api-key, or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }
    Ok(config)
}

fn build_orchestrator(
    config: &AppConfig,
    gateway: Arc<dyn ConfirmationGateway>,
) -> Result<AgentOrchestrator, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let provider = Arc::new(MistralProvider::from_config(config)?);
    let tools = Arc::new(default_registry(
        cwd.clone(),
        ToolSettings {
            linkup_api_key: config.tools.linkup_api_key.clone(),
            bash_timeout_secs: config.tools.bash_timeout_secs,
        },
    ));
    Ok(AgentOrchestrator::new(
        provider,
        tools,
        gateway,
        OrchestratorConfig::from_app_config(config, cwd),
    ))
}

/// Run one prompt to completion and print the conversation it produced.
///
/// Nobody is there to answer confirmations, so mutating tools are approved.
pub async fn run_headless(
    options: SessionOptions,
    prompt: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&options)?;
    let agent = build_orchestrator(&config, Arc::new(AutoApprove))?;

    for entry in agent.process(prompt, config.agent.default_mode).await {
        match entry.kind {
            ChatEntryKind::User => {}
            ChatEntryKind::Assistant if !entry.content.is_empty() => println!("{}", entry.content),
            ChatEntryKind::Assistant => {}
            ChatEntryKind::ToolResult => eprintln!("  ⎿ {}", entry.display_content()),
        }
    }
    Ok(())
}

/// The interactive prompt loop.
pub async fn run_interactive(options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&options)?;
    let input = Arc::new(LineInput::stdin());
    let agent = build_orchestrator(&config, Arc::new(TerminalConfirmation::new(input.clone())))?;
    let mut mode = config.agent.default_mode;

    println!();
    println!("  CodeClaw — coding assistant powered by Devstral");
    println!();
    println!("  Model:      {}", config.default_model);
    println!("  Mode:       {mode}");
    println!("  Directory:  {}", agent.current_directory().display());
    println!();
    println!("  Type /help for commands, 'exit' to quit.");

    loop {
        print!("\n{mode} > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = input.next_line() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse(&line) {
            Line::Empty => {}
            Line::Prompt(text) => stream_submission(&agent, &input, &text, &mut mode).await?,
            Line::BadMode(name) => {
                println!("Unknown mode '{name}'. Use auto-accept-off, auto-accept-on or plan.")
            }
            Line::Command(SlashCommand::Exit) => break,
            Line::Command(command) => run_command(&agent, command, &mut mode).await,
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Stream one request to the terminal.
///
/// When the reply is a plan, ask whether to carry it out. Proceeding switches
/// `mode` and runs the same request again.
async fn stream_submission(
    agent: &AgentOrchestrator,
    input: &LineInput,
    text: &str,
    mode: &mut Mode,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if !render_submission(agent, text, *mode).await? {
            return Ok(());
        }
        let decision = plan::ask(input).await;
        if !plan::apply(agent, decision, mode) {
            println!("Staying in plan mode. Refine your request.");
            return Ok(());
        }
        println!("Mode: {mode}");
    }
}

/// Render a submission's chunks. Returns whether a plan was produced.
async fn render_submission(
    agent: &AgentOrchestrator,
    text: &str,
    mode: Mode,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut stream = agent.submit(text, mode);
    let mut renderer = ChunkRenderer::default();
    let mut stdout = std::io::stdout();
    let mut planned = false;

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(chunk) => {
                    planned |= matches!(chunk, StreamingChunk::Plan { .. });
                    renderer.render(&chunk, &mut stdout)?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => agent.cancel(),
        }
    }

    debug!(tokens = renderer.tokens(), planned, "Submission rendered");
    Ok(planned)
}

async fn run_command(agent: &AgentOrchestrator, command: SlashCommand, mode: &mut Mode) {
    match command {
        SlashCommand::Help => println!("{HELP}"),
        SlashCommand::Clear => {
            agent.clear_history().await;
            println!("Conversation cleared.");
        }
        SlashCommand::Models(None) => {
            let current = agent.current_model().await;
            println!("Available models:");
            for (name, description) in AVAILABLE_MODELS {
                let marker = if *name == current { "*" } else { " " };
                println!("  {marker} {name}  {description}");
            }
        }
        SlashCommand::Models(Some(name)) => {
            if AppConfig::is_known_model(&name) {
                agent.set_model(&name).await;
                println!("Switched to {name}.");
            } else {
                println!("Unknown model '{name}'. Run /models to list them.");
            }
        }
        SlashCommand::Mode(next) => {
            *mode = next.unwrap_or_else(|| mode.cycle());
            println!("Mode: {mode}");
        }
        SlashCommand::Plan => {
            *mode = Mode::Plan;
            println!("Mode: {mode}");
        }
        SlashCommand::Context => {
            let left = agent.context_percentage_left().await;
            println!("Context: {left}% left ({})", agent.current_model().await);
        }
        SlashCommand::Exit => {}
        SlashCommand::Unknown(name) => println!("Unknown command '/{name}'. Type /help."),
    }
}
