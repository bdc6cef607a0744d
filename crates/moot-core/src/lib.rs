pub mod config;
pub mod error;
pub mod persona;
pub mod secret;
pub mod status;
pub mod telemetry;

// Re-export common error type
pub use error::{MootError, Result};
pub use status::{FailureKind, SessionStatus};
