//! Core types for model conversations and completions.

use serde::{Deserialize, Serialize};

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// The model's turn. Dashboard payloads call this `assistant`.
    #[serde(alias = "assistant")]
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }
}

/// A request for a single model completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction, sent separately from the conversation.
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// Enable Google Search grounding for this call.
    pub grounding: bool,
    /// Ask for a bare JSON response. Ignored when grounding is enabled.
    pub json_response: bool,
    /// Per-request model override.
    pub model: Option<String>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            system: None,
            messages: Vec::new(),
            temperature: 0.7,
            max_output_tokens: None,
            grounding: false,
            json_response: false,
            model: None,
        }
    }
}

impl CompletionRequest {
    /// A single-turn request with a system instruction.
    pub fn prompt(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: vec![Message::user(user)],
            ..Default::default()
        }
    }

    /// The text of the last user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A completed model response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
    pub grounding: Option<GroundingMetadata>,
}

impl CompletionResponse {
    /// Distinct web sources the answer was grounded on.
    pub fn sources(&self) -> Vec<WebSource> {
        self.grounding
            .as_ref()
            .map(GroundingMetadata::sources)
            .unwrap_or_default()
    }
}

/// Token usage statistics from an LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Search grounding attached to a Gemini response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_search_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl GroundingMetadata {
    /// Web sources in chunk order, first occurrence of each URI kept.
    pub fn sources(&self) -> Vec<WebSource> {
        let mut seen = std::collections::HashSet::new();
        self.grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter(|web| seen.insert(web.uri.clone()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

/// A web page cited by grounding or by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}
