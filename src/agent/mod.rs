//! Foundry Agent text operations
//!
//! - `FoundryClient`: one conversation + one response per call, never retried
//! - `AgentService`: generate / review / rewrite / chat with error-text translation

pub mod client;
pub mod messages;
pub mod service;

pub use client::{AgentBackend, FoundryClient};
pub use service::{chat_input, AgentRole, AgentService};
