//! HTTP Client
//!
//! Thin async transport over `reqwest`: bearer auth, JSON bodies, status
//! checking, and header-only opening of streaming responses.

use crate::error::{DeepSeekError, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one base address
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,

    /// Base address, without trailing slash
    base_url: String,

    /// `Authorization` header value, if this client adds one itself
    auth: Option<HeaderValue>,

    /// Time allowed for a full response, or for the headers of a stream
    timeout: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with its own connection pool
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DeepSeekError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_client(client, base_url, api_key, timeout)
    }

    /// Wrap a caller-configured reqwest client.
    ///
    /// Without an API key, authentication is left to the client's own
    /// default headers.
    pub fn with_client(
        client: Client,
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let auth = api_key.map(bearer).transpose()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, %url, "sending request");

        let builder = self.client.request(method, url);
        match &self.auth {
            Some(auth) => builder.header(AUTHORIZATION, auth.clone()),
            None => builder,
        }
    }

    fn send_error(&self, err: reqwest::Error) -> DeepSeekError {
        if err.is_timeout() {
            DeepSeekError::Timeout(self.timeout.as_secs())
        } else {
            DeepSeekError::Http(err)
        }
    }

    /// Make a GET request and decode the JSON response
    pub async fn get_json<R>(&self, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, path)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        read_json(response).await
    }

    /// Make a POST request with a JSON body and decode the JSON response
    pub async fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;

        let response = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        read_json(response).await
    }

    /// Make a streaming POST request.
    ///
    /// Returns once the response headers arrive; the timeout covers only that
    /// wait, never the body.
    pub async fn post_stream<T>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<BoxStream<'static, std::io::Result<Bytes>>>
    where
        T: Serialize,
    {
        let body = serde_json::to_vec(body)?;

        let send = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| DeepSeekError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<failed to read error body: {}>", e),
            };
            tracing::warn!(%status, "streaming request failed");
            return Err(DeepSeekError::Api { status, body });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed())
    }
}

fn bearer(api_key: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .map_err(|e| DeepSeekError::Config(format!("Invalid API key format: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Check status and body, then decode
async fn read_json<R>(response: Response) -> Result<R>
where
    R: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(%status, "request failed");
        return Err(DeepSeekError::Api { status, body });
    }

    if body.trim().is_empty() {
        tracing::warn!(%status, "empty response body");
        return Err(DeepSeekError::EmptyResponse);
    }

    Ok(serde_json::from_str(&body)?)
}
