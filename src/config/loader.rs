//! Configuration Loader
//!
//! Layers client configuration from built-in defaults, JSON files and the
//! environment (later layers win).

use crate::config::settings::{ClientConfig, ConfigFile};
use crate::error::{DeepSeekError, Result};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DEEPSEEK_CONFIG_PATH";
pub const ENV_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_BASE_URL: &str = "DEEPSEEK_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "DEEPSEEK_TIMEOUT_SECS";

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: ClientConfig,
}

impl ConfigLoader {
    /// Load from default file locations and the environment
    pub fn new() -> Result<Self> {
        let mut loader = Self {
            config: ClientConfig::default(),
        };

        loader.load_from_default_paths()?;
        loader.apply_env()?;

        Ok(loader)
    }

    /// Load a specific config file, then the environment
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self {
            config: ClientConfig::default(),
        };

        loader.load_from_file(path)?;
        loader.apply_env()?;

        Ok(loader)
    }

    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Config paths, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".deepseek").join("config.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("deepseek").join("config.json"));
        }

        paths.push(PathBuf::from("deepseek.json"));

        if let Ok(custom_path) = std::env::var(ENV_CONFIG_PATH) {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeepSeekError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let layer: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            DeepSeekError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");
        layer.apply_to(&mut self.config);
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides read through `lookup`
    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.config.api_key = Some(key);
        }

        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.config.base_url = url;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.config.timeout_secs = secs.trim().parse().map_err(|e| {
                DeepSeekError::Config(format!("Invalid {}={:?}: {}", ENV_TIMEOUT_SECS, secs, e))
            })?;
        }

        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn into_config(self) -> ClientConfig {
        self.config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config: ClientConfig::default(),
        })
    }
}
