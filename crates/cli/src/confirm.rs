//! Terminal confirmation for file edits and shell commands.

use async_trait::async_trait;
use codeclaw_core::confirmation::{ConfirmationGateway, ConfirmationOutcome, ConfirmationRequest};
use std::io::Write;
use std::sync::Arc;

use crate::input::LineInput;

const PREVIEW_LINES: usize = 20;

/// Asks the user on the terminal before a mutating tool runs.
pub struct TerminalConfirmation {
    input: Arc<LineInput>,
}

impl TerminalConfirmation {
    pub fn new(input: Arc<LineInput>) -> Self {
        Self { input }
    }
}

/// Interpret a typed answer. Anything but yes or all rejects.
pub fn parse_answer(answer: &str) -> ConfirmationOutcome {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => ConfirmationOutcome::Approved,
        "a" | "all" => ConfirmationOutcome::ApprovedForSession,
        _ => ConfirmationOutcome::Rejected { reason: None },
    }
}

fn describe(request: &ConfirmationRequest) -> String {
    let mut text = format!("\n┌ {}", request.operation);
    if let Some(filename) = &request.filename {
        text.push_str(&format!(": {filename}"));
    }
    if let Some(content) = &request.content {
        let total = content.lines().count();
        for line in content.lines().take(PREVIEW_LINES) {
            text.push_str(&format!("\n│ {line}"));
        }
        if total > PREVIEW_LINES {
            text.push_str(&format!("\n│ ... ({} more lines)", total - PREVIEW_LINES));
        }
    }
    text
}

#[async_trait]
impl ConfirmationGateway for TerminalConfirmation {
    async fn request(&self, request: ConfirmationRequest) -> ConfirmationOutcome {
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "{}", describe(&request));
        let _ = write!(stdout, "└ Allow? [y]es / [a]ll this session / [n]o: ");
        let _ = stdout.flush();

        match self.input.next_line().await {
            Some(answer) => parse_answer(&answer),
            None => ConfirmationOutcome::Rejected {
                reason: Some("no input available".into()),
            },
        }
    }
}
