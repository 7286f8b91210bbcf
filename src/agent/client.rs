use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::info;

use super::messages::{AgentResponse, AgentReference, Conversation, ResponseRequest};
use crate::config::FoundryConfig;

/// Sends one prompt to a named agent and returns its completion text
#[async_trait::async_trait]
pub trait AgentBackend: Send + Sync {
    async fn respond(&self, agent: &str, input: &str) -> Result<String>;
}

/// Foundry Agent client over the project's OpenAI-compatible REST surface
pub struct FoundryClient {
    client: Client,
    endpoint: String,
    api_version: String,
    api_key: Option<String>,
}

impl FoundryClient {
    pub fn new(config: &FoundryConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/openai/{}?api-version={}", self.endpoint, path, self.api_version)
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", path))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            bail!("API error: {} - {}", status.as_u16(), text);
        }

        Ok(text)
    }

    /// Create a fresh conversation for a single exchange
    pub async fn create_conversation(&self) -> Result<String> {
        let body = self.post("conversations", &serde_json::json!({})).await?;
        let conversation: Conversation =
            serde_json::from_str(&body).context("Failed to parse conversation")?;
        Ok(conversation.id)
    }
}

#[async_trait::async_trait]
impl AgentBackend for FoundryClient {
    async fn respond(&self, agent: &str, input: &str) -> Result<String> {
        let conversation = self.create_conversation().await?;
        info!("Conversation created: {}", conversation);

        info!("Sending message to agent '{}'", agent);
        let request = ResponseRequest {
            agent: AgentReference::new(agent),
            conversation,
            input: input.to_string(),
        };

        let body = self.post("responses", &request).await?;
        let response: AgentResponse =
            serde_json::from_str(&body).context("Failed to parse agent response")?;

        info!("Received response from agent '{}'", agent);
        Ok(response.output_text())
    }
}
