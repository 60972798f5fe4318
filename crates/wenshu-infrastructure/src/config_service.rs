//! Configuration service implementation.
//!
//! Loads the orchestrator configuration from `config.toml`
//! (`~/.config/wenshu/config.toml` by default).

use crate::paths::WenshuPaths;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use wenshu_core::config::OrchestratorConfig;
use wenshu_core::error::{Result, WenshuError};

/// Configuration service that loads and caches the orchestrator configuration.
///
/// A missing file is not an error: defaults are used. A file that exists but
/// fails to parse is logged and also falls back to defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; `None` resolves the platform default on load.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<OrchestratorConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading the platform default location.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a ConfigService reading `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> OrchestratorConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[Config] Falling back to default configuration: {}", e);
                OrchestratorConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_config(&self) -> Result<OrchestratorConfig> {
        let path = self.config_path()?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[Config] No config file at {}", path.display());
                return Ok(OrchestratorConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(OrchestratorConfig::default());
        }

        let config = toml::from_str(&content)?;
        tracing::info!("[Config] Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => WenshuPaths::config_file().map_err(|e| WenshuError::config(e.to_string())),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
