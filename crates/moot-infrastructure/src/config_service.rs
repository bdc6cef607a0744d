//! Configuration service implementation.
//!
//! Loads `MootConfig` from `~/.config/moot/config.toml` and applies
//! environment overrides on top.

use crate::paths::MootPaths;
use moot_core::config::MootConfig;
use moot_core::error::{MootError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ENV_PERSONA_BASE_URL: &str = "MOOT_PERSONA_BASE_URL";
pub const ENV_ANALYSIS_BASE_URL: &str = "MOOT_ANALYSIS_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MOOT_REQUEST_TIMEOUT_SECS";

/// Configuration service that loads and caches the root configuration.
///
/// A missing file yields the defaults; a malformed file is an error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: MootPaths,
    config: Arc<RwLock<Option<MootConfig>>>,
}

impl ConfigService {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: MootPaths::new(base_path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<MootConfig> {
        if let Ok(read_lock) = self.config.read() {
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let mut loaded = Self::load_file(&self.config_path()?)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok())?;

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Writes the given configuration, creating the directory when needed.
    pub fn save(&self, config: &MootConfig) -> Result<PathBuf> {
        let path = self.config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(config)?)?;
        self.invalidate_cache();
        Ok(path)
    }

    fn config_path(&self) -> Result<PathBuf> {
        self.paths
            .config_file()
            .map_err(|e| MootError::config(e.to_string()))
    }

    fn load_file(path: &Path) -> Result<MootConfig> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(MootConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: MootConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Applies `MOOT_*` overrides through the given lookup.
pub fn apply_env_overrides<F>(config: &mut MootConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_PERSONA_BASE_URL) {
        config.persona.base_url = url;
    }
    if let Some(url) = lookup(ENV_ANALYSIS_BASE_URL) {
        config.analysis.base_url = url;
    }
    if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        let secs: u64 = raw.trim().parse().map_err(|_| {
            MootError::config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be whole seconds, got '{raw}'"))
        })?;
        if secs == 0 {
            return Err(MootError::config(format!(
                "{ENV_REQUEST_TIMEOUT_SECS} must be at least 1 second"
            )));
        }
        config.timeouts.request_secs = secs;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = ConfigService::load_file(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(loaded, MootConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(Some(temp_dir.path()));

        let mut config = MootConfig::default();
        config.analysis.base_url = "http://analysis.local/api".to_string();
        config.timeouts.request_secs = 3;
        let path = service.save(&config).unwrap();

        let loaded = ConfigService::load_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[analysis\nperiod_secs = ").unwrap();

        let err = ConfigService::load_file(&path).unwrap_err();
        assert!(matches!(err, MootError::Serialization { .. }));
    }

    #[test]
    fn test_zero_request_timeout_in_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[timeouts]\nrequest_secs = 0\n").unwrap();

        let err = ConfigService::load_file(&path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ANALYSIS_BASE_URL, "http://10.0.0.2:8003/api"),
            (ENV_REQUEST_TIMEOUT_SECS, " 4 "),
        ]);
        let mut config = MootConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.analysis.base_url, "http://10.0.0.2:8003/api");
        assert_eq!(config.timeouts.request_secs, 4);
        assert_eq!(config.persona.base_url, moot_core::config::DEFAULT_PERSONA_BASE_URL);
    }

    #[test]
    fn test_bad_timeout_override_is_config_error() {
        let mut config = MootConfig::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == ENV_REQUEST_TIMEOUT_SECS).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_zero_timeout_override_is_config_error() {
        let mut config = MootConfig::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == ENV_REQUEST_TIMEOUT_SECS).then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(err.is_config());
        assert_eq!(config.timeouts.request_secs, 10);
    }
}
