//! User-visible status reporting.

use serde::{Deserialize, Serialize};

/// The failure taxonomy shared by both live-session components.
///
/// Every fallible call is caught where it is made and tagged with one of
/// these kinds; none of them terminates the session host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Token issuance or connect failed; the session returned to idle
    Connect,
    /// A mid-stream command (mute, send, stop generation) failed
    Command,
    /// Resuming after a stream interruption failed
    Resume,
    /// One analysis tick failed and was dropped
    AnalysisTick,
    /// Finalize or summary request failed
    Finalize,
}

/// The single human-readable status reflecting the most recent outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub message: String,
    /// Set when the outcome was a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl SessionStatus {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            failure: Some(kind),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}
