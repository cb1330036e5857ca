//! Gemini `generateContent` client.
//!
//! Gemini rejects conversations where two adjacent contents share a role,
//! so history goes through the turn normalizer before it is sent.

use crate::app::chat::turns::{Turn, TurnRole, normalize_turns};
use crate::app::types::Message;
use crate::backends::{Provider, decode, read_body};
use crate::config::ProviderConfig;
use crate::error::ChatError;
use serde::{Deserialize, Serialize};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_NONE: &str = "BLOCK_NONE";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Non-text parts deserialize with an empty text
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        // Gemini refuses empty text parts
        let text = if text.is_empty() { " " } else { text };
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

fn wire_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    }
}

/// Builds the request body from already-windowed history
pub fn build_request(
    history: &[Message],
    current_message: &str,
    system_instruction: &str,
    temperature: f32,
) -> GenerateContentRequest {
    let contents = normalize_turns(history, current_message)
        .iter()
        .map(|Turn { role, text }| Content::text(Some(wire_role(*role)), text))
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Content::text(None, system_instruction),
        generation_config: GenerationConfig { temperature },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_string(),
                threshold: BLOCK_NONE.to_string(),
            })
            .collect(),
    }
}

/// Text of the first candidate, or an empty string when there is none
pub fn reply_text(response: GenerateContentResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

pub async fn generate(
    client: &reqwest::Client,
    settings: &ProviderConfig,
    api_key: &str,
    request: &GenerateContentRequest,
) -> Result<String, ChatError> {
    let provider = Provider::Gemini;
    let url = format!(
        "{}/models/{}:generateContent",
        settings.base_url.trim_end_matches('/'),
        settings.model
    );
    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(request)
        .send()
        .await
        .map_err(|source| ChatError::BackendNetwork { provider, source })?;

    let body = read_body(provider, response).await?;
    let payload: GenerateContentResponse = decode(provider, &body)?;
    Ok(reply_text(payload))
}
