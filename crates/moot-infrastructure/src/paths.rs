//! Unified path management for moot configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/moot/              # Config directory
//! ├── config.toml              # Endpoints, capture period, timeouts
//! └── secret.json              # Persona API key
//! ```

use std::path::{Path, PathBuf};

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves moot's files below the config directory.
///
/// `MootPaths::new(Some(dir))` roots everything at `dir` instead of the home
/// directory, which is what tests use.
#[derive(Debug, Clone)]
pub struct MootPaths {
    base: Option<PathBuf>,
}

impl MootPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the moot configuration directory (e.g. `~/.config/moot/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        Ok(home.join(".config").join("moot"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }
}

impl Default for MootPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
