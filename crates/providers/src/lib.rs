//! LLM provider implementations for CodeClaw.
//!
//! Providers implement the `codeclaw_core::Provider` trait. The only
//! transport shipped today is the Mistral chat-completions endpoint.

pub mod mistral;

pub use mistral::MistralProvider;
