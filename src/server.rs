//! Stateless HTTP endpoint for browser front-ends.
//!
//! The caller owns the conversation: every request carries the history, the
//! context name and the pre-rendered digests, and the server only assembles
//! the system instruction, dispatches one provider call and extracts charts.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::chat::context::build_system_instruction;
use crate::app::chat::response::extract_reply;
use crate::app::types::Message;
use crate::backends::{Backend, BackendRequest, Provider};
use crate::catalog::ContextId;
use crate::error::ChatError;

/// Shared state handed to every handler
pub struct ServerState<B> {
    pub backend: Arc<B>,
    pub persona: Arc<str>,
    pub default_provider: Provider,
}

impl<B> Clone for ServerState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            persona: Arc::clone(&self.persona),
            default_provider: self.default_provider,
        }
    }
}

impl<B> ServerState<B> {
    pub fn new(backend: B, persona: &str, default_provider: Provider) -> Self {
        Self {
            backend: Arc::new(backend),
            persona: Arc::from(persona),
            default_provider,
        }
    }
}

/// A history entry as the front-end sends it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(default)]
    pub text: String,
    /// `user`; any other value is treated as a system reply
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub module_id: Option<String>,
}

impl WireMessage {
    fn into_message(self) -> Message {
        let context = self
            .module_id
            .as_deref()
            .and_then(|id| id.parse::<ContextId>().ok());
        if self.sender == "user" {
            Message::user(self.text, context)
        } else {
            Message::system(self.text, context)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<WireMessage>,
    pub current_message: String,
    /// Display name of the context the front-end is in
    #[serde(default)]
    pub context_module: String,
    #[serde(default)]
    pub global_context: String,
    #[serde(default)]
    pub tools_context: String,
    #[serde(default)]
    pub model_provider: Option<Provider>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub text: String,
    pub chart_data: Option<JsonValue>,
}

/// Handler error carrying the text shown to the user
pub struct ApiError(ChatError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::Busy => StatusCode::TOO_MANY_REQUESTS,
            ChatError::Configuration { .. }
            | ChatError::BackendStatus { .. }
            | ChatError::BackendNetwork { .. }
            | ChatError::BackendDecode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ChatReply {
            text: self.0.diagnostic(),
            chart_data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        Self(error)
    }
}

/// Creates the router with CORS and request tracing
pub fn router<B>(state: ServerState<B>) -> Router
where
    B: Backend + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::<B>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `port` on all interfaces and serves until the process exits
pub async fn serve<B>(state: ServerState<B>, port: u16) -> color_eyre::Result<()>
where
    B: Backend + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(address = %listener.local_addr()?, "backend server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

async fn chat<B>(
    State(state): State<ServerState<B>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError>
where
    B: Backend + Send + Sync + 'static,
{
    let current_message = request.current_message.trim().to_string();
    if current_message.is_empty() {
        return Err(ChatError::EmptyMessage.into());
    }

    let provider = request.model_provider.unwrap_or(state.default_provider);
    tracing::info!(
        %provider,
        context = %request.context_module,
        history = request.history.len(),
        "chat request received"
    );

    let backend_request = BackendRequest {
        provider,
        history: request
            .history
            .into_iter()
            .map(WireMessage::into_message)
            .collect(),
        current_message,
        system_instruction: build_system_instruction(
            &state.persona,
            &request.context_module,
            &request.tools_context,
            &request.global_context,
        ),
    };

    let raw = state.backend.complete(&backend_request).await?;
    let reply = extract_reply(&raw);
    Ok(Json(ChatReply {
        text: reply.text,
        chart_data: reply.chart,
    }))
}
