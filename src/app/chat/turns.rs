use crate::app::types::{Message, Sender};

/// Separator placed between merged same-role texts
const MERGE_SEPARATOR: &str = "\n\n";

/// Role of a turn in a strictly alternating conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<Sender> for TurnRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Self::User,
            Sender::System => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Converts a context's history plus the new user message into alternating turns.
///
/// Consecutive entries with the same role are merged into one turn, so no
/// two adjacent turns share a role. Texts are kept verbatim.
pub fn normalize_turns(history: &[Message], current: &str) -> Vec<Turn> {
    let tagged = history
        .iter()
        .map(|message| (TurnRole::from(message.sender), message.text.as_str()))
        .chain(std::iter::once((TurnRole::User, current)));

    let mut turns: Vec<Turn> = Vec::new();
    let mut pending: Option<Turn> = None;
    for (role, text) in tagged {
        match pending.as_mut() {
            Some(turn) if turn.role == role => {
                turn.text.push_str(MERGE_SEPARATOR);
                turn.text.push_str(text);
            }
            _ => {
                if let Some(done) = pending.take() {
                    turns.push(done);
                }
                pending = Some(Turn {
                    role,
                    text: text.to_string(),
                });
            }
        }
    }
    if let Some(done) = pending {
        turns.push(done);
    }
    turns
}
