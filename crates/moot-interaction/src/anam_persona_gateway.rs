//! AnamPersonaGateway - persona gateway backed by the Anam REST API.
//!
//! Token issuance is a plain HTTP call made here. The media stream itself is
//! owned by the host's streaming transport, plugged in as a [`StreamConnector`].

use async_trait::async_trait;
use moot_core::config::PersonaSettings;
use moot_core::error::{MootError, Result};
use moot_core::persona::{PersonaClient, PersonaConfig, PersonaGateway, SessionToken};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::http::read_json;

const SESSION_TOKEN_PATH: &str = "auth/session-token";

/// Opens the persona media stream for an issued token.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(&self, token: &SessionToken) -> Result<Arc<dyn PersonaClient>>;
}

/// Gateway that talks to the Anam HTTP API.
#[derive(Clone)]
pub struct AnamPersonaGateway {
    client: Client,
    api_key: String,
    base_url: String,
    connector: Option<Arc<dyn StreamConnector>>,
}

impl AnamPersonaGateway {
    /// Creates a gateway for the given base URL (e.g. `https://api.anam.ai/v1`).
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connector: None,
        })
    }

    pub fn from_settings(api_key: impl Into<String>, settings: &PersonaSettings, timeout: Duration) -> Result<Self> {
        Self::new(api_key, settings.base_url.clone(), timeout)
    }

    /// Attaches the streaming transport used by [`PersonaGateway::connect`].
    pub fn with_connector(mut self, connector: Arc<dyn StreamConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}", self.base_url, SESSION_TOKEN_PATH)
    }
}

#[async_trait]
impl PersonaGateway for AnamPersonaGateway {
    async fn issue_session_token(&self, config: &PersonaConfig) -> Result<SessionToken> {
        let body = SessionTokenRequest {
            persona_config: PersonaConfigBody::from(config),
        };

        tracing::debug!(target: "persona_gateway", "Requesting session token for {}", config.display_name);
        let response = self
            .client
            .post(self.token_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                MootError::gateway(
                    None,
                    format!("Session token request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        let parsed: SessionTokenResponse = read_json(response, "session token").await?;
        if parsed.session_token.trim().is_empty() {
            return Err(MootError::gateway(
                None,
                "Persona API returned an empty session token",
                false,
            ));
        }
        Ok(SessionToken::new(parsed.session_token))
    }

    async fn connect(&self, token: &SessionToken) -> Result<Arc<dyn PersonaClient>> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| MootError::config("No persona stream transport configured"))?;
        connector.open(token).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokenRequest {
    persona_config: PersonaConfigBody,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersonaConfigBody {
    name: String,
    avatar_id: String,
    voice_id: String,
    llm_id: String,
    system_prompt: String,
}

impl From<&PersonaConfig> for PersonaConfigBody {
    fn from(config: &PersonaConfig) -> Self {
        Self {
            name: config.display_name.clone(),
            avatar_id: config.avatar_id.clone(),
            voice_id: config.voice_id.clone(),
            llm_id: config.model_id.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokenResponse {
    session_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = PersonaConfig {
            display_name: "Cara".to_string(),
            avatar_id: "a".to_string(),
            voice_id: "v".to_string(),
            model_id: "m".to_string(),
            system_prompt: "You are Cara.".to_string(),
        };
        let body = serde_json::to_value(SessionTokenRequest {
            persona_config: PersonaConfigBody::from(&config),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "personaConfig": {
                    "name": "Cara",
                    "avatarId": "a",
                    "voiceId": "v",
                    "llmId": "m",
                    "systemPrompt": "You are Cara."
                }
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let gateway = AnamPersonaGateway::new("k", "https://api.anam.ai/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.token_url(), "https://api.anam.ai/v1/auth/session-token");
    }
}
