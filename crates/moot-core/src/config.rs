//! Configuration model.
//!
//! `MootConfig` mirrors `~/.config/moot/config.toml`; `SecretConfig` mirrors
//! `~/.config/moot/secret.json`. Loading lives in `moot-infrastructure`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{MootError, Result};

pub const DEFAULT_PERSONA_BASE_URL: &str = "https://api.anam.ai/v1";
pub const DEFAULT_ANALYSIS_BASE_URL: &str = "http://localhost:8003/api";

/// Root configuration loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct MootConfig {
    #[serde(default)]
    pub persona: PersonaSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

impl MootConfig {
    /// Rejects values that would make every gateway call fail.
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.request_secs == 0 {
            return Err(MootError::config(
                "timeouts.request_secs must be at least 1 second",
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PersonaSettings {
    /// Base URL of the persona API (token issuing endpoint lives below it)
    #[serde(default = "default_persona_base_url")]
    pub base_url: String,
    /// Preset id used when none is given on the command line
    #[serde(default = "default_preset")]
    pub preset: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            base_url: default_persona_base_url(),
            preset: default_preset(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Base URL of the frame analysis backend
    #[serde(default = "default_analysis_base_url")]
    pub base_url: String,
    /// Capture period of the telemetry loop, in seconds
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
    /// Every n-th processed frame is flagged for persistence by the backend
    #[serde(default = "default_save_every")]
    pub save_every: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            base_url: default_analysis_base_url(),
            period_secs: default_period_secs(),
            save_every: default_save_every(),
        }
    }
}

impl AnalysisSettings {
    /// Non-finite or negative values yield a zero period.
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.period_secs).unwrap_or(Duration::ZERO)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TimeoutSettings {
    /// Bound applied to every gateway call, in seconds
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
        }
    }
}

impl TimeoutSettings {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

fn default_persona_base_url() -> String {
    DEFAULT_PERSONA_BASE_URL.to_string()
}

fn default_preset() -> String {
    "judge".to_string()
}

fn default_analysis_base_url() -> String {
    DEFAULT_ANALYSIS_BASE_URL.to_string()
}

fn default_period_secs() -> f64 {
    2.0
}

fn default_save_every() -> u64 {
    10
}

fn default_request_secs() -> u64 {
    10
}

/// Secret configuration loaded from secret.json.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub anam: Option<AnamConfig>,
}

/// Persona API credential.
#[derive(Deserialize, Serialize, Clone)]
pub struct AnamConfig {
    pub api_key: String,
}

impl std::fmt::Debug for AnamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnamConfig")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
