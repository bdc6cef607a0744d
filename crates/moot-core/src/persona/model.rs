//! Persona domain model.
//!
//! A `PersonaProfile` is the reusable description of a courtroom persona
//! (judge, counsellor, ...). Each chat start turns it into an immutable
//! `PersonaConfig` carrying the case context, and a successful connect yields
//! one `PersonaSession`.

use serde::{Deserialize, Serialize};

use super::prompt::render_system_prompt;
use crate::error::Result;

/// A reusable persona definition.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaProfile {
    /// Stable preset identifier (e.g. "judge")
    pub id: String,
    /// Name shown to the user and sent to the persona service
    pub display_name: String,
    pub avatar_id: String,
    pub voice_id: String,
    /// LLM backing the persona on the remote side
    pub model_id: String,
    /// System prompt before any case context is attached
    pub base_prompt: String,
}

impl PersonaProfile {
    /// Builds the immutable config for one chat start.
    ///
    /// Blank context is treated as absent.
    pub fn to_config(&self, context: Option<&str>) -> Result<PersonaConfig> {
        let context = context.map(str::trim).filter(|c| !c.is_empty());
        Ok(PersonaConfig {
            display_name: self.display_name.clone(),
            avatar_id: self.avatar_id.clone(),
            voice_id: self.voice_id.clone(),
            model_id: self.model_id.clone(),
            system_prompt: render_system_prompt(&self.base_prompt, context)?,
        })
    }
}

/// Immutable description of the persona to instantiate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub display_name: String,
    pub avatar_id: String,
    pub voice_id: String,
    pub model_id: String,
    pub system_prompt: String,
}

/// Opaque, single-use credential for one persona connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, log-safe rendering ("abcd…" plus length).
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}… ({} chars)", self.0.chars().count())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"<redacted>").finish()
    }
}

/// Connection lifecycle of a persona session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    CreatingToken,
    Connecting,
    Connected,
    Streaming,
    Interrupted,
    Stopped,
}

impl ConnectionState {
    /// Whether `self -> next` is an edge of the lifecycle.
    ///
    /// Teardown (`Stopped`) and failure (`Idle`) are reachable from every
    /// non-idle state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Idle, CreatingToken) => true,
            (Idle, _) => false,
            (_, Idle) | (_, Stopped) => self != Stopped || next == Idle,
            (CreatingToken, Connecting) => true,
            (Connecting, Connected) => true,
            (Connected, Streaming) => true,
            (Streaming, Interrupted) => true,
            (Interrupted, Interrupted) | (Interrupted, Streaming) => true,
            _ => false,
        }
    }

    /// A session object exists in these states.
    pub fn has_client(self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Streaming | ConnectionState::Interrupted
        )
    }
}

/// One active connection to the remote persona.
#[derive(Debug, Clone)]
pub struct PersonaSession {
    pub token: SessionToken,
    pub state: ConnectionState,
    /// Correlation id of the most recent interrupted turn
    pub last_correlation_id: Option<String>,
}

impl PersonaSession {
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            state: ConnectionState::Connected,
            last_correlation_id: None,
        }
    }
}
