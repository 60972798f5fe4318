//! Unified path management for wenshu configuration and session files.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for wenshu.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/wenshu/            # Config directory (platform default)
/// ├── config.toml              # Orchestrator configuration
/// └── sessions/                # One JSON file per session
/// ```
pub struct WenshuPaths;

impl WenshuPaths {
    const APP_DIR: &'static str = "wenshu";

    /// Returns the wenshu configuration directory (e.g. `~/.config/wenshu/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding session files.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }
}
