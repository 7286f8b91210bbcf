use serde::{Deserialize, Serialize};

/// Reference to a named agent in the Foundry project
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentReference {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AgentReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "agent_reference".to_string(),
        }
    }
}

/// Body of `POST /openai/responses`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseRequest {
    pub agent: AgentReference,
    pub conversation: String,
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct Conversation {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl AgentResponse {
    /// Concatenated text of every `output_text` part, in order
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}
