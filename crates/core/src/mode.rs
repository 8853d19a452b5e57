//! Operational modes.
//!
//! The mode decides which instructions the model receives and which tools
//! are allowed to run. Exactly one mode is active per session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Mutating tools ask the confirmation gateway before acting.
    #[default]
    AutoAcceptOff,
    /// Mutating tools run without asking.
    AutoAcceptOn,
    /// Read-only analysis; mutating tools are refused outright.
    Plan,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::AutoAcceptOff, Mode::AutoAcceptOn, Mode::Plan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoAcceptOff => "auto-accept-off",
            Self::AutoAcceptOn => "auto-accept-on",
            Self::Plan => "plan",
        }
    }

    pub fn is_plan(&self) -> bool {
        matches!(self, Self::Plan)
    }

    /// The mode that follows this one in the interactive toggle order.
    pub fn cycle(&self) -> Self {
        match self {
            Self::AutoAcceptOff => Self::AutoAcceptOn,
            Self::AutoAcceptOn => Self::Plan,
            Self::Plan => Self::AutoAcceptOff,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto-accept-off" | "off" | "default" => Ok(Self::AutoAcceptOff),
            "auto-accept-on" | "on" | "auto" => Ok(Self::AutoAcceptOn),
            "plan" => Ok(Self::Plan),
            other => Err(format!(
                "unknown mode '{other}' (expected auto-accept-off, auto-accept-on or plan)"
            )),
        }
    }
}
