//! Client Builder

use crate::client::http::HttpClient;
use crate::config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_ENDPOINT, DEFAULT_COMPLETION_ENDPOINT,
    DEFAULT_TIMEOUT_SECS,
};
use crate::error::{DeepSeekError, Result};
use crate::DeepSeekClient;
use std::time::Duration;

/// Builder for [`DeepSeekClient`]
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    chat_endpoint: String,
    completion_endpoint: String,
    http_client: Option<reqwest::Client>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chat_endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            completion_endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            http_client: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            chat_endpoint: config.chat_endpoint.clone(),
            completion_endpoint: config.completion_endpoint.clone(),
            http_client: None,
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn chat_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.chat_endpoint = endpoint.into();
        self
    }

    pub fn completion_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.completion_endpoint = endpoint.into();
        self
    }

    /// Use a caller-configured reqwest client (shared pool, proxies, or
    /// default headers that already carry authentication)
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<DeepSeekClient> {
        let api_key = self.api_key.as_deref();

        let http = match self.http_client {
            Some(client) => HttpClient::with_client(client, &self.base_url, api_key, self.timeout)?,
            None => {
                if api_key.is_none() {
                    return Err(DeepSeekError::Config(
                        "No API key configured. Set DEEPSEEK_API_KEY or pass one to the builder"
                            .to_string(),
                    ));
                }
                HttpClient::new(&self.base_url, api_key, self.timeout)?
            }
        };

        Ok(DeepSeekClient::from_parts(
            http,
            self.chat_endpoint,
            self.completion_endpoint,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_api_key() {
        let err = ClientBuilder::new().build().err().unwrap();
        assert!(matches!(err, DeepSeekError::Config(_)));
    }

    #[test]
    fn test_injected_client_without_key() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080/")
            .http_client(reqwest::Client::new())
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 7,
            chat_endpoint: "/v1/chat/completions".to_string(),
            completion_endpoint: "/v1/completions".to_string(),
        };

        let client = ClientBuilder::from_config(&config).build().unwrap();
        assert_eq!(client.chat_endpoint(), "/v1/chat/completions");
        assert_eq!(client.completion_endpoint(), "/v1/completions");
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }
}
