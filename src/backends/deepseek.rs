use crate::app::types::Message;
use crate::backends::Provider;
use crate::backends::openai_compat::{self, ChatMessage, ChatRequest};
use crate::config::ProviderConfig;
use crate::error::ChatError;

/// Builds the flat message list: system instruction, windowed history, current message
pub fn build_request(
    history: &[Message],
    current_message: &str,
    system_instruction: &str,
    settings: &ProviderConfig,
) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_instruction));
    messages.extend(openai_compat::convert_messages(history));
    messages.push(ChatMessage::user(current_message));

    ChatRequest {
        model: settings.model.clone(),
        messages,
        temperature: settings.temperature,
        stream: false,
    }
}

pub async fn chat(
    client: &reqwest::Client,
    settings: &ProviderConfig,
    api_key: &str,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    let url = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
    openai_compat::post_chat(client, Provider::DeepSeek, &url, api_key, request).await
}
