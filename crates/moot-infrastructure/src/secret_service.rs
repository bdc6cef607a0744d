//! Secret service implementation.
//!
//! Reads the persona API key from `secret.json`, falling back to the
//! `ANAM_API_KEY` environment variable.

use crate::paths::MootPaths;
use moot_core::config::{AnamConfig, SecretConfig};
use moot_core::error::{MootError, Result};
use moot_core::secret::SecretService;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub const ENV_ANAM_API_KEY: &str = "ANAM_API_KEY";

/// Service for managing secret configuration.
///
/// The loaded file is cached after the first successful read.
pub struct SecretServiceImpl {
    paths: MootPaths,
    secrets: RwLock<Option<SecretConfig>>,
}

impl SecretServiceImpl {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: MootPaths::new(base_path),
            secrets: RwLock::new(None),
        }
    }

    fn secret_path(&self) -> std::result::Result<PathBuf, String> {
        self.paths.secret_file().map_err(|e| e.to_string())
    }

    async fn load_secrets_internal(&self) -> std::result::Result<SecretConfig, String> {
        if let Some(cached) = self.secrets.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let path = self.secret_path()?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e.kind()))?;
        // serde_json errors carry line/column only, never the offending value
        let loaded: SecretConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

        *self.secrets.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    /// Resolves the persona API key: secret.json first, then the environment.
    pub async fn resolve_anam(&self) -> Result<AnamConfig> {
        self.resolve_anam_with(|key| std::env::var(key).ok()).await
    }

    async fn resolve_anam_with<F>(&self, lookup: F) -> Result<AnamConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.load_secrets_internal().await {
            Ok(SecretConfig {
                anam: Some(anam), ..
            }) if !anam.api_key.trim().is_empty() => return Ok(anam),
            Ok(_) => tracing::debug!("secret.json has no anam api_key, trying environment"),
            Err(e) => tracing::debug!("secret.json unavailable ({e}), trying environment"),
        }

        lookup(ENV_ANAM_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| AnamConfig { api_key })
            .ok_or_else(|| {
                MootError::security(format!(
                    "{ENV_ANAM_API_KEY} not found in secret.json or environment variables"
                ))
            })
    }
}

impl Default for SecretServiceImpl {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> std::result::Result<SecretConfig, String> {
        self.load_secrets_internal().await
    }

    async fn secret_file_exists(&self) -> bool {
        match self.secret_path() {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
