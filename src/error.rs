//! Error types for the chat pipeline.

use crate::backends::Provider;

/// Errors from the routing and dispatch pipeline.
///
/// Failures never leave the pipeline as an out-of-band channel: the session
/// turns them into a system message using [`ChatError::diagnostic`].
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a request is already in flight for this session")]
    Busy,
    #[error("missing credential {variable} for {provider}")]
    Configuration {
        provider: Provider,
        variable: &'static str,
    },
    #[error("{provider} API error: {status} {body}")]
    BackendStatus {
        provider: Provider,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{provider} request error: {source}")]
    BackendNetwork {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} response could not be decoded: {detail}")]
    BackendDecode { provider: Provider, detail: String },
}

impl ChatError {
    /// True for missing-credential failures, which are never worth retrying
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// User-visible text appended to the conversation when a turn fails
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Configuration { provider, variable } => format!(
                "**Config Error**: Server missing {} ({}).",
                variable,
                provider.display_name()
            ),
            Self::EmptyMessage | Self::Busy => self.to_string(),
            Self::BackendStatus { .. } | Self::BackendNetwork { .. } | Self::BackendDecode { .. } => {
                format!("**Server Error**: {self}")
            }
        }
    }
}
