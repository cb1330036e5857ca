use crate::catalog::ContextId;
use crate::services::chart::ChartPayload;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
}

/// An atomic turn in a conversation, immutable once appended to the store
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
    /// None for messages created before routing happened
    pub context: Option<ContextId>,
    /// Raw chart JSON extracted from a system reply
    pub chart: Option<JsonValue>,
}

impl Message {
    fn new(text: impl Into<String>, sender: Sender, context: Option<ContextId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Local::now(),
            context,
            chart: None,
        }
    }

    pub fn user(text: impl Into<String>, context: Option<ContextId>) -> Self {
        Self::new(text, Sender::User, context)
    }

    pub fn system(text: impl Into<String>, context: Option<ContextId>) -> Self {
        Self::new(text, Sender::System, context)
    }

    /// Creates a system reply carrying an extracted chart block
    pub fn system_with_chart(
        text: impl Into<String>,
        context: Option<ContextId>,
        chart: Option<JsonValue>,
    ) -> Self {
        Self {
            chart,
            ..Self::new(text, Sender::System, context)
        }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// Interprets the attached chart JSON, if any
    #[must_use]
    pub fn chart_payload(&self) -> Option<ChartPayload> {
        self.chart.as_ref().and_then(ChartPayload::from_value)
    }
}
