pub mod deepseek;
pub mod gemini;
#[path = "openai-compat.rs"]
pub mod openai_compat;

use crate::app::types::Message;
use crate::config::{Config, HttpConfig, ProviderConfig};
use crate::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Number of history messages sent with each call; older history is dropped
pub const HISTORY_WINDOW: usize = 10;

/// Text-generation provider selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Turn-based API with a separate system-instruction channel
    #[default]
    Gemini,
    /// OpenAI-style flat message list
    DeepSeek,
}

impl Provider {
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::DeepSeek => "DeepSeek",
        }
    }

    /// Environment variable that carries this provider's credential
    #[must_use]
    pub fn credential_var(self) -> &'static str {
        match self {
            Self::Gemini => crate::config::GEMINI_KEY_VARS[0],
            Self::DeepSeek => crate::config::DEEPSEEK_KEY_VAR,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Everything a provider needs to answer one user turn
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub provider: Provider,
    /// Target-context history, oldest first, without the current message
    pub history: Vec<Message>,
    pub current_message: String,
    pub system_instruction: String,
}

/// A provider-shaped request body, ready to send
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Gemini(gemini::GenerateContentRequest),
    DeepSeek(openai_compat::ChatRequest),
}

impl ProviderCall {
    /// Shapes `request` for its provider, keeping the last `history_window` messages
    pub fn shape(request: &BackendRequest, settings: &ProviderConfig, history_window: usize) -> Self {
        let skip = request.history.len().saturating_sub(history_window);
        let history = request.history.get(skip..).unwrap_or_default();
        match request.provider {
            Provider::Gemini => Self::Gemini(gemini::build_request(
                history,
                &request.current_message,
                &request.system_instruction,
                settings.temperature,
            )),
            Provider::DeepSeek => Self::DeepSeek(deepseek::build_request(
                history,
                &request.current_message,
                &request.system_instruction,
                settings,
            )),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Self::Gemini(_) => Provider::Gemini,
            Self::DeepSeek(_) => Provider::DeepSeek,
        }
    }
}

/// Seam between the chat pipeline and a text-generation service
pub trait Backend {
    /// Issues exactly one call and returns the raw reply text
    fn complete(
        &self,
        request: &BackendRequest,
    ) -> impl Future<Output = Result<String, ChatError>> + Send;
}

/// Routes backend requests to the configured providers over HTTP
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    gemini: ProviderConfig,
    deepseek: ProviderConfig,
    history_window: usize,
}

impl Dispatcher {
    /// Creates a dispatcher from configuration
    pub fn new(config: &Config) -> color_eyre::Result<Self> {
        Ok(Self {
            client: build_client(&config.http)?,
            gemini: config.gemini.clone(),
            deepseek: config.deepseek.clone(),
            history_window: config.routing.history_window,
        })
    }

    #[must_use]
    pub fn settings(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::DeepSeek => &self.deepseek,
        }
    }

    /// Checks that the provider has a credential before any call is made
    pub fn check_ready(&self, provider: Provider) -> Result<&str, ChatError> {
        self.settings(provider)
            .credential()
            .ok_or(ChatError::Configuration {
                provider,
                variable: provider.credential_var(),
            })
    }
}

impl Backend for Dispatcher {
    async fn complete(&self, request: &BackendRequest) -> Result<String, ChatError> {
        let provider = request.provider;
        let api_key = self.check_ready(provider)?;
        let settings = self.settings(provider);
        let call = ProviderCall::shape(request, settings, self.history_window);

        tracing::info!(
            provider = %call.provider(),
            model = %settings.model,
            history = request.history.len(),
            "dispatching chat request"
        );
        let start = Instant::now();
        let result = match &call {
            ProviderCall::Gemini(body) => gemini::generate(&self.client, settings, api_key, body).await,
            ProviderCall::DeepSeek(body) => deepseek::chat(&self.client, settings, api_key, body).await,
        };
        match &result {
            Ok(text) => tracing::info!(
                %provider,
                elapsed_ms = start.elapsed().as_millis(),
                chars = text.chars().count(),
                "chat request finished"
            ),
            Err(error) => tracing::warn!(%provider, %error, "chat request failed"),
        }
        result
    }
}

/// Builds a `reqwest::Client` with the configured timeouts
pub fn build_client(http: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .timeout(Duration::from_secs(http.request_timeout_secs))
        .build()
}

/// Reads a provider response body, turning non-success statuses into errors
pub(crate) async fn read_body(
    provider: Provider,
    response: reqwest::Response,
) -> Result<String, ChatError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ChatError::BackendNetwork { provider, source })?;
    if !status.is_success() {
        return Err(ChatError::BackendStatus {
            provider,
            status,
            body,
        });
    }
    Ok(body)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    provider: Provider,
    body: &str,
) -> Result<T, ChatError> {
    serde_json::from_str(body).map_err(|error| ChatError::BackendDecode {
        provider,
        detail: error.to_string(),
    })
}
