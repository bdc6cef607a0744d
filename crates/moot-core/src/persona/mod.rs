//! Persona domain: configuration, connection lifecycle and the gateway seam.

pub mod event;
pub mod gateway;
pub mod model;
pub mod prompt;

pub use event::{ChatMessage, ListenerId, PersonaEvent, PersonaEventKind, PersonaListener};
pub use gateway::{PersonaClient, PersonaGateway};
pub use model::{ConnectionState, PersonaConfig, PersonaProfile, PersonaSession, SessionToken};
