//! Shared types and helpers for OpenAI-compatible chat APIs (DeepSeek, etc.)

use crate::app::chat::turns::TurnRole;
use crate::app::types::Message;
use crate::backends::{Provider, decode, read_body};
use crate::error::ChatError;
use serde::{Deserialize, Serialize};

// -- Shared request/response types --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// The message inside a choice; content may be null
#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// -- Conversion helpers --

/// Converts stored messages into a flat role/content list.
/// No merging is done; providers of this family accept repeated roles.
pub fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| {
            let role = match TurnRole::from(message.sender) {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            ChatMessage {
                role: role.to_string(),
                content: message.text.clone(),
            }
        })
        .collect()
}

/// Extracts the assistant reply; a missing choice or null content is an empty reply
pub fn extract_reply(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default()
}

/// Posts a chat-completions request with bearer auth and returns the reply text
pub async fn post_chat(
    client: &reqwest::Client,
    provider: Provider,
    url: &str,
    api_key: &str,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await
        .map_err(|source| ChatError::BackendNetwork { provider, source })?;

    let body = read_body(provider, response).await?;
    let payload: ChatResponse = decode(provider, &body)?;
    Ok(extract_reply(payload))
}
