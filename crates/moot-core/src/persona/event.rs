use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One entry of the persona conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "persona"
    pub role: String,
    pub content: String,
}

/// Inbound events published by a connected persona client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PersonaEvent {
    /// The remote stream is up.
    ConnectionEstablished,
    /// The in-flight talk stream was cut; resuming needs the correlation id.
    TalkStreamInterrupted { correlation_id: String },
    /// Full conversation history after a change.
    MessageHistoryUpdated { messages: Vec<ChatMessage> },
    /// Incremental stream event, passed through untouched.
    MessageStreamEvent { event: serde_json::Value },
}

impl PersonaEvent {
    pub fn kind(&self) -> PersonaEventKind {
        match self {
            Self::ConnectionEstablished => PersonaEventKind::ConnectionEstablished,
            Self::TalkStreamInterrupted { .. } => PersonaEventKind::TalkStreamInterrupted,
            Self::MessageHistoryUpdated { .. } => PersonaEventKind::MessageHistoryUpdated,
            Self::MessageStreamEvent { .. } => PersonaEventKind::MessageStreamEvent,
        }
    }
}

/// Event kinds a listener can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PersonaEventKind {
    ConnectionEstablished,
    TalkStreamInterrupted,
    MessageHistoryUpdated,
    MessageStreamEvent,
}

/// Handle returned when a listener is registered; used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Listeners receive events over an unbounded channel so the client never
/// blocks on a slow consumer.
pub type PersonaListener = mpsc::UnboundedSender<PersonaEvent>;
