//! # CodeClaw Core
//!
//! Domain types, traits, and error definitions for the CodeClaw coding
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is defined as a trait here
//! (`Provider`, `Tool`, `ConfirmationGateway`). Implementations live in their
//! respective crates. This enables:
//! - Swapping the remote model transport without touching the loop
//! - Easy testing with scripted mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod chat;
pub mod confirmation;
pub mod error;
pub mod event;
pub mod message;
pub mod mode;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use chat::{ChatEntry, ChatEntryKind};
pub use confirmation::{
    AutoApprove, ConfirmationGateway, ConfirmationKind, ConfirmationOutcome, ConfirmationRequest,
    SessionApprovals,
};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, ToolCall};
pub use mode::Mode;
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolContext, ToolRegistry, ToolResult};
