pub mod chat;
pub mod types;

pub use types::*;

use crate::app::chat::context::DigestSettings;
use crate::app::chat::intent::IntentClassifier;
use crate::backends::Provider;
use crate::catalog::ContextId;
use crate::config::Config;
use crate::storage::ContextStore;
use uuid::Uuid;

/// Conversation state for one user.
///
/// Routing, provider selection and the in-flight flag live here instead of
/// in the UI, and every pipeline step takes the session explicitly.
pub struct Session {
    pub id: Uuid,
    current_context: ContextId,
    provider: Provider,
    store: ContextStore,
    in_flight: bool,
    classifier: IntentClassifier,
    digest: DigestSettings,
    history_window: usize,
    persona: String,
}

impl Session {
    /// Creates an unrouted session from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            current_context: ContextId::Dashboard,
            provider: config.default_provider,
            store: ContextStore::new(),
            in_flight: false,
            classifier: IntentClassifier::new(config.routing.keyword_weight),
            digest: config.routing.digest(),
            history_window: config.routing.history_window,
            persona: config.persona.clone(),
        }
    }

    #[must_use]
    pub fn current_context(&self) -> ContextId {
        self.current_context
    }

    /// True until the first request has been routed, or after returning home
    #[must_use]
    pub fn is_unrouted(&self) -> bool {
        !self.current_context.is_routable()
    }

    /// Commits the session to a context. `Dashboard` makes it unrouted again.
    pub fn pin_context(&mut self, context: ContextId) {
        tracing::debug!(session = %self.id, %context, "context pinned");
        self.current_context = context;
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
    }

    /// True while a backend call is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Conversation of the current context
    #[must_use]
    pub fn history(&self) -> Vec<&Message> {
        self.store.filter(self.current_context)
    }
}
