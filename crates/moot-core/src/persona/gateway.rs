//! Persona gateway traits.
//!
//! The persona service is an external collaborator. `moot-interaction` provides
//! the HTTP side (token issuance); the streaming transport is plugged in by the
//! host through [`PersonaGateway::connect`].

use std::sync::Arc;

use super::event::{ListenerId, PersonaEventKind, PersonaListener};
use super::model::{PersonaConfig, SessionToken};
use crate::error::Result;

/// Entry point to the remote persona service.
#[async_trait::async_trait]
pub trait PersonaGateway: Send + Sync {
    /// Issues a one-shot session token for the given persona.
    async fn issue_session_token(&self, config: &PersonaConfig) -> Result<SessionToken>;

    /// Opens a client for the token. The token is consumed by the remote side.
    async fn connect(&self, token: &SessionToken) -> Result<Arc<dyn PersonaClient>>;
}

/// A connected persona client.
///
/// Every command is independently fallible; a failure in one says nothing
/// about the availability of another.
#[async_trait::async_trait]
pub trait PersonaClient: Send + Sync {
    /// Binds the persona stream to a render target identifier.
    async fn stream_to(&self, target: &str) -> Result<()>;

    async fn stop_streaming(&self) -> Result<()>;

    /// Stops the generation currently being spoken.
    async fn interrupt_generation(&self) -> Result<()>;

    async fn resume_from_interruption(&self, correlation_id: &str) -> Result<()>;

    async fn mute_input(&self) -> Result<()>;

    async fn unmute_input(&self) -> Result<()>;

    async fn send_user_message(&self, text: &str) -> Result<()>;

    fn add_listener(&self, kind: PersonaEventKind, listener: PersonaListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}
