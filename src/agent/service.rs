use std::sync::Arc;
use tracing::{error, info};

use super::client::AgentBackend;
use crate::config::FoundryConfig;

/// Which configured agent handles a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Answer,
    Review,
    Rewrite,
    Chat,
}

impl AgentRole {
    fn label(self) -> &'static str {
        match self {
            AgentRole::Answer => "Agent",
            AgentRole::Review => "Review agent",
            AgentRole::Rewrite => "Rewrite agent",
            AgentRole::Chat => "Chat agent",
        }
    }

    fn agent_id(self, config: &FoundryConfig) -> &str {
        match self {
            AgentRole::Answer => &config.agent_id,
            AgentRole::Review => &config.review_agent_id,
            AgentRole::Rewrite => &config.rewrite_agent_id,
            AgentRole::Chat => &config.chat_agent_id,
        }
    }
}

/// Front door for the text agents.
///
/// Every operation returns displayable text: configuration problems and
/// backend failures come back as `Error: ...` messages instead of `Err`.
pub struct AgentService {
    config: FoundryConfig,
    backend: Arc<dyn AgentBackend>,
}

impl AgentService {
    pub fn new(config: FoundryConfig, backend: Arc<dyn AgentBackend>) -> Self {
        Self { config, backend }
    }

    /// Answer a question with the main agent
    pub async fn generate_response(&self, question: &str) -> String {
        self.run(AgentRole::Answer, question.to_string()).await
    }

    /// Ask the review agent to critique a draft
    pub async fn review_response(&self, text: &str) -> String {
        let request = format!(
            "Review and improve the following text. Point out what should be improved:\n\n{}",
            text
        );
        self.run(AgentRole::Review, request).await
    }

    /// Ask the rewrite agent for a corrected draft
    pub async fn rewrite_response(&self, text: &str) -> String {
        let request = format!("Improve and correct the following AI-generated text:\n\n{}", text);
        self.run(AgentRole::Rewrite, request).await
    }

    /// Free-form chat, optionally grounded in earlier context
    pub async fn chat(&self, message: &str, context: &str) -> String {
        self.run(AgentRole::Chat, chat_input(message, context)).await
    }

    async fn run(&self, role: AgentRole, input: String) -> String {
        let endpoint = self.config.endpoint.trim();
        let agent = role.agent_id(&self.config).trim();

        if endpoint.is_empty() {
            error!("Foundry Agent endpoint is not configured");
            return "Error: Foundry Agent endpoint is not configured. Check the configuration file."
                .to_string();
        }

        if agent.is_empty() {
            error!("{} name is not configured", role.label());
            return format!(
                "Error: {} name is not configured. Check the configuration file.",
                role.label()
            );
        }

        info!("{} '{}' handling request ({} chars)", role.label(), agent, input.len());

        match self.backend.respond(agent, &input).await {
            Ok(text) => text,
            Err(e) => {
                error!("{} request failed: {:#}", role.label(), e);
                match role {
                    AgentRole::Chat => format!("Error: {}", e),
                    _ => format!(
                        "Error: {}\n\nCheck the configuration:\n- Endpoint: {}\n- {} name: {}",
                        e,
                        endpoint,
                        role.label(),
                        agent
                    ),
                }
            }
        }
    }
}

/// Prefix the user's message with known background when there is any
pub fn chat_input(message: &str, context: &str) -> String {
    if context.trim().is_empty() {
        message.to_string()
    } else {
        format!("[Known background]\n{}\n\n[User question]\n{}", context, message)
    }
}
