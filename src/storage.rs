use crate::app::types::Message;
use crate::catalog::ContextId;
use uuid::Uuid;

/// Append-only log of every message exchanged in a session.
///
/// Messages keep their insertion order for the lifetime of the store, so
/// filtering by context always yields that context's conversation in
/// chronological order.
#[derive(Debug, Default, Clone)]
pub struct ContextStore {
    messages: Vec<Message>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns its id
    pub fn append(&mut self, message: Message) -> Uuid {
        tracing::trace!(
            id = %message.id,
            context = ?message.context,
            sender = ?message.sender,
            "append message"
        );
        let id = message.id;
        self.messages.push(message);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every message filed under `context`, in insertion order
    #[must_use]
    pub fn filter(&self, context: ContextId) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|message| message.context == Some(context))
            .collect()
    }

    /// The last `count` messages of `context`
    #[must_use]
    pub fn tail(&self, context: ContextId, count: usize) -> Vec<&Message> {
        let mut filtered = self.filter(context);
        let skip = filtered.len().saturating_sub(count);
        filtered.drain(..skip);
        filtered
    }

    /// The last `count` messages across all contexts
    #[must_use]
    pub fn recent(&self, count: usize) -> &[Message] {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.get(skip..).unwrap_or_default()
    }

    /// The last `count` messages whose context differs from `excluded`.
    ///
    /// The window is global, not per context. Unrouted messages count as
    /// different from every context.
    #[must_use]
    pub fn recent_excluding(&self, excluded: ContextId, count: usize) -> Vec<&Message> {
        let mut others: Vec<&Message> = self
            .messages
            .iter()
            .filter(|message| message.context != Some(excluded))
            .collect();
        let skip = others.len().saturating_sub(count);
        others.drain(..skip);
        others
    }
}
