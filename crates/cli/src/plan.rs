//! Approving a plan produced in plan mode.

use codeclaw_agent::AgentOrchestrator;
use codeclaw_core::mode::Mode;
use std::io::Write;
use tracing::info;

use crate::input::LineInput;

const OPTIONS: [&str; 3] = [
    "Yes, and auto-accept edits",
    "Yes, and manually approve edits",
    "No, keep planning",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    AutoAccept,
    ManualApprove,
    KeepPlanning,
}

/// Interpret a typed choice. Anything unrecognised keeps planning.
pub fn parse_decision(answer: &str) -> PlanDecision {
    match answer.trim().to_lowercase().as_str() {
        "1" | "a" | "auto" => PlanDecision::AutoAccept,
        "2" | "m" | "manual" => PlanDecision::ManualApprove,
        _ => PlanDecision::KeepPlanning,
    }
}

/// Offer the three choices and wait for one. Closed input keeps planning.
pub async fn ask(input: &LineInput) -> PlanDecision {
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "\nWould you like to proceed?");
    for (index, option) in OPTIONS.iter().enumerate() {
        let _ = writeln!(stdout, "  {}. {option}", index + 1);
    }
    let _ = write!(stdout, "Choose [1-3]: ");
    let _ = stdout.flush();

    match input.next_line().await {
        Some(answer) => parse_decision(&answer),
        None => PlanDecision::KeepPlanning,
    }
}

/// Switch mode and session approvals for the decision.
///
/// Returns `true` when the request that produced the plan should run again.
pub fn apply(agent: &AgentOrchestrator, decision: PlanDecision, mode: &mut Mode) -> bool {
    match decision {
        PlanDecision::AutoAccept => {
            *mode = Mode::AutoAcceptOn;
            agent.approve_session();
        }
        PlanDecision::ManualApprove => {
            *mode = Mode::AutoAcceptOff;
            agent.reset_session_approvals();
        }
        PlanDecision::KeepPlanning => {
            *mode = Mode::Plan;
            return false;
        }
    }
    info!(mode = %mode, "Plan approved");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions() {
        assert_eq!(parse_decision("1"), PlanDecision::AutoAccept);
        assert_eq!(parse_decision(" 2 "), PlanDecision::ManualApprove);
        assert_eq!(parse_decision("3"), PlanDecision::KeepPlanning);
        assert_eq!(parse_decision(""), PlanDecision::KeepPlanning);
        assert_eq!(parse_decision("yes please"), PlanDecision::KeepPlanning);
    }

    #[tokio::test]
    async fn closed_input_keeps_planning() {
        let input = LineInput::scripted(&[]);
        assert_eq!(ask(&input).await, PlanDecision::KeepPlanning);
    }
}
