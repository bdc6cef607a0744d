//! Error types for the Moot workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every Moot crate.
///
/// Gateway implementations map transport and HTTP failures into these variants;
/// the application layer maps them further into a [`crate::status::FailureKind`]
/// before surfacing anything to a user.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MootError {
    /// A remote gateway rejected the call or could not be reached
    #[error("Gateway error ({}): {message}", status_code.map(|c| c.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Gateway {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },

    /// A gateway call exceeded its configured bound
    #[error("Timed out after {after_ms}ms: {operation}")]
    Timeout {
        operation: String,
        after_ms: u64,
    },

    /// No live local capture source is attached
    #[error("No capture source: {0}")]
    NoCaptureSource(String),

    /// Frame capture failed
    #[error("Capture error: {0}")]
    Capture(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Security/authentication error
    #[error("Security error: {0}")]
    Security(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MootError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Gateway error
    pub fn gateway(status_code: Option<u16>, message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Gateway {
            status_code,
            message: message.into(),
            is_retryable,
        }
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Security error
    pub fn security(message: impl Into<String>) -> Self {
        Self::Security(message.into())
    }

    /// Creates a Capture error
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a gateway error
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a security error
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Check if retrying the same call could succeed.
    ///
    /// Timeouts count as retryable; gateway errors carry their own flag.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway { is_retryable, .. } => *is_retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MootError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MootError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MootError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MootError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MootError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway {
            status_code: err.status().map(|s| s.as_u16()),
            is_retryable: err.is_connect() || err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for MootError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("Template error: {err}"))
    }
}

/// Conversion from anyhow::Error (used at binary boundaries)
impl From<anyhow::Error> for MootError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, MootError>`.
pub type Result<T> = std::result::Result<T, MootError>;
