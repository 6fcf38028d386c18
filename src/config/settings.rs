//! Client Configuration
//!
//! Defines the configuration schema for a DeepSeek client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hosted API address
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Hosted beta address (prefix completion and other beta features)
pub const BETA_BASE_URL: &str = "https://api.deepseek.com/beta";

pub const DEFAULT_CHAT_ENDPOINT: &str = "/chat/completions";
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "/completions";
pub const MODELS_ENDPOINT: &str = "/models";
pub const USER_BALANCE_ENDPOINT: &str = "/user/balance";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Resolved configuration for one client
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bearer token
    pub api_key: Option<String>,

    /// Base address; override for self-hosted, API-compatible servers
    pub base_url: String,

    /// Timeout for a full response, or for stream headers
    pub timeout_secs: u64,

    /// Path of the chat endpoint
    pub chat_endpoint: String,

    /// Path of the completion endpoint; used verbatim unless `base_url` is the
    /// hosted address, which gets a `/beta` prefix
    pub completion_endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chat_endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            completion_endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("chat_endpoint", &self.chat_endpoint)
            .field("completion_endpoint", &self.completion_endpoint)
            .finish()
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether this points at the hosted API
    pub fn is_hosted(&self) -> bool {
        is_hosted(&self.base_url)
    }
}

pub(crate) fn is_hosted(base_url: &str) -> bool {
    base_url.trim_end_matches('/') == DEFAULT_BASE_URL
}

/// One configuration file layer; absent fields leave earlier layers intact
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub chat_endpoint: Option<String>,
    pub completion_endpoint: Option<String>,
}

impl ConfigFile {
    pub fn apply_to(self, config: &mut ClientConfig) {
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(endpoint) = self.chat_endpoint {
            config.chat_endpoint = endpoint;
        }
        if let Some(endpoint) = self.completion_endpoint {
            config.completion_endpoint = endpoint;
        }
    }
}
