//! Confirmation gateway — user approval for side-effecting tools.
//!
//! Mutating tool handlers describe what they are about to do and ask the
//! gateway. The gateway is injected explicitly (through
//! [`ToolContext`](crate::tool::ToolContext)); there is no process-wide
//! notifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;

/// Which family of operations a request belongs to.
///
/// "Approve for this session" is remembered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    File,
    Bash,
}

/// What a tool wants to do, shown to the user before it happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// Human-readable operation, e.g. "Create file" or "Run bash command"
    pub operation: String,

    pub kind: ConfirmationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Proposed content, diff, or command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ConfirmationRequest {
    pub fn new(kind: ConfirmationKind, operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            kind,
            filename: None,
            content: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Approved,
    /// Approve this and every later request of the same kind until cleared.
    ApprovedForSession,
    Rejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// The approval mechanism consulted by mutating tools.
#[async_trait]
pub trait ConfirmationGateway: Send + Sync {
    async fn request(&self, request: ConfirmationRequest) -> ConfirmationOutcome;
}

/// A gateway that approves everything. Used for non-interactive runs.
pub struct AutoApprove;

#[async_trait]
impl ConfirmationGateway for AutoApprove {
    async fn request(&self, _request: ConfirmationRequest) -> ConfirmationOutcome {
        ConfirmationOutcome::Approved
    }
}

/// Operation kinds the user approved for the rest of the session.
#[derive(Debug, Default)]
pub struct SessionApprovals {
    kinds: Mutex<HashSet<ConfirmationKind>>,
}

impl SessionApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_approved(&self, kind: ConfirmationKind) -> bool {
        self.kinds
            .lock()
            .map(|kinds| kinds.contains(&kind))
            .unwrap_or(false)
    }

    pub fn approve(&self, kind: ConfirmationKind) {
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.insert(kind);
        }
    }

    pub fn reset(&self) {
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.clear();
        }
    }
}
