//! Parsing of interactive input lines.

use codeclaw_core::mode::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    /// List models, or switch to the named one
    Models(Option<String>),
    /// Switch to the named mode, or cycle when none is given
    Mode(Option<Mode>),
    Plan,
    Context,
    Exit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Empty,
    Command(SlashCommand),
    Prompt(String),
    /// A `/mode` argument that names no mode
    BadMode(String),
}

pub const HELP: &str = "Commands:
  /help            Show this help
  /clear           Clear the conversation
  /models [name]   List models or switch model
  /mode [name]     Switch mode (auto-accept-off, auto-accept-on, plan), or cycle
  /plan            Switch to plan mode
  /context         Show remaining context
  exit, quit       Leave CodeClaw

Press Ctrl+C to cancel a running request.";

pub fn parse(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    if matches!(line, "exit" | "quit") {
        return Line::Command(SlashCommand::Exit);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Line::Prompt(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    let command = match name {
        "help" => SlashCommand::Help,
        "clear" => SlashCommand::Clear,
        "models" | "model" => SlashCommand::Models(arg.map(str::to_string)),
        "mode" => match arg.map(str::parse::<Mode>) {
            None => SlashCommand::Mode(None),
            Some(Ok(mode)) => SlashCommand::Mode(Some(mode)),
            Some(Err(_)) => return Line::BadMode(arg.unwrap_or_default().to_string()),
        },
        "plan" => SlashCommand::Plan,
        "context" => SlashCommand::Context,
        "exit" | "quit" => SlashCommand::Exit,
        other => SlashCommand::Unknown(other.to_string()),
    };
    Line::Command(command)
}
