//! DeepSeek - async client for the DeepSeek chat and completion API
//!
//! Request construction, response decoding, and incremental streaming of
//! chat and completion results over Server-Sent Events.
//!
//! ```no_run
//! use deepseek::{ChatRequest, DeepSeekClient, Message};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> deepseek::Result<()> {
//! let client = DeepSeekClient::new("sk-...")?;
//! let request = ChatRequest::new(vec![Message::user("Hello")]);
//! let cancel = CancellationToken::new();
//!
//! let mut choices = client.chat_stream(&request, &cancel).await?;
//! while let Some(choice) = choices.next().await {
//!     print!("{}", choice?.content().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use api::{
    ChatRequest, ChatResponse, Choice, ChoiceStream, CompletionRequest, Delta, FinishReason,
    Message, Model, ModelResponse, ResponseFormat, Role, StreamAccumulator, StreamUsage, Usage,
    UserBalance, UserResponse, DEEPSEEK_CHAT, DEEPSEEK_CODER, DEEPSEEK_REASONER,
};
pub use client::ClientBuilder;
pub use config::{ClientConfig, ConfigLoader, BETA_BASE_URL, DEFAULT_BASE_URL};
pub use error::{DeepSeekError, Result};

use api::{decode_sse_with_usage, Payload};
use client::HttpClient;
use config::{MODELS_ENDPOINT, USER_BALANCE_ENDPOINT};

/// Client for the DeepSeek API.
///
/// Every operation returns its outcome directly. The message of the most
/// recent failure is also kept for inspection via [`last_error`], which is
/// shared by all calls on this instance.
///
/// [`last_error`]: DeepSeekClient::last_error
#[derive(Debug)]
pub struct DeepSeekClient {
    /// HTTP transport
    http: HttpClient,

    chat_endpoint: String,

    completion_endpoint: String,

    last_error: Mutex<Option<String>>,
}

impl DeepSeekClient {
    /// Create a client for the hosted API
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(
        http: HttpClient,
        chat_endpoint: String,
        completion_endpoint: String,
    ) -> Self {
        Self {
            http,
            chat_endpoint,
            completion_endpoint,
            last_error: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub fn timeout(&self) -> Duration {
        self.http.timeout()
    }

    pub fn chat_endpoint(&self) -> &str {
        &self.chat_endpoint
    }

    pub fn completion_endpoint(&self) -> &str {
        &self.completion_endpoint
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.http.set_timeout(timeout);
    }

    pub fn set_chat_endpoint(&mut self, endpoint: impl Into<String>) {
        self.chat_endpoint = endpoint.into();
    }

    /// Set the completion path. Against the hosted API it is still prefixed
    /// with `/beta`; against any other base address it is used as given.
    pub fn set_completion_endpoint(&mut self, endpoint: impl Into<String>) {
        self.completion_endpoint = endpoint.into();
    }

    /// Message of the most recent failed call on this client
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// List the model catalog
    pub async fn list_models(&self, cancel: &CancellationToken) -> Result<ModelResponse> {
        let result = cancellable(cancel, self.http.get_json(MODELS_ENDPOINT)).await;
        self.record(result)
    }

    /// Chat completion, waiting for the full response
    pub async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let payload = Payload::new(request, false);
        let result = cancellable(cancel, self.http.post_json(&self.chat_endpoint, &payload)).await;
        self.record(result)
    }

    /// Chat completion as a stream of deltas
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChoiceStream> {
        self.open_stream(&self.chat_endpoint, request, cancel, StreamUsage::new())
            .await
    }

    /// Chat completion as a stream of deltas, plus the usage the server
    /// reports once the stream ends (requires
    /// [`ChatRequest::with_usage_in_stream`])
    pub async fn chat_stream_with_usage(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<(ChoiceStream, StreamUsage)> {
        let usage = StreamUsage::new();
        let choices = self
            .open_stream(&self.chat_endpoint, request, cancel, usage.clone())
            .await?;
        Ok((choices, usage))
    }

    /// Prompt completion, waiting for the full response
    pub async fn completions(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        let path = self.completion_path();
        let payload = Payload::new(request, false);
        let result = cancellable(cancel, self.http.post_json(&path, &payload)).await;
        self.record(result)
    }

    /// Prompt completion as a stream of text choices
    pub async fn completions_stream(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChoiceStream> {
        let path = self.completion_path();
        self.open_stream(&path, request, cancel, StreamUsage::new())
            .await
    }

    /// Prompt completion as a stream, plus the usage reported at its end
    pub async fn completions_stream_with_usage(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<(ChoiceStream, StreamUsage)> {
        let path = self.completion_path();
        let usage = StreamUsage::new();
        let choices = self
            .open_stream(&path, request, cancel, usage.clone())
            .await?;
        Ok((choices, usage))
    }

    /// Account balance
    pub async fn user_balance(&self, cancel: &CancellationToken) -> Result<UserResponse> {
        let result = cancellable(cancel, self.http.get_json(USER_BALANCE_ENDPOINT)).await;
        self.record(result)
    }

    /// Completion lives under `/beta` on the hosted API
    fn completion_path(&self) -> String {
        if config::settings::is_hosted(self.http.base_url()) {
            format!("/beta{}", self.completion_endpoint)
        } else {
            self.completion_endpoint.clone()
        }
    }

    /// Send a streaming request and decode its body once headers arrive
    async fn open_stream<T>(
        &self,
        path: &str,
        request: &T,
        cancel: &CancellationToken,
        usage: StreamUsage,
    ) -> Result<ChoiceStream>
    where
        T: Serialize,
    {
        let payload = Payload::new(request, true);
        let result = cancellable(cancel, self.http.post_stream(path, &payload)).await;
        let body = self.record(result)?;

        Ok(decode_sse_with_usage(
            StreamReader::new(body),
            cancel.clone(),
            usage,
        ))
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if !err.is_cancelled() {
                *self.last_error.lock() = Some(err.to_string());
            }
        }
        result
    }
}

/// Race `fut` against the cancellation token
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DeepSeekError::Cancelled),
        result = fut => result,
    }
}
