//! Completion API
//!
//! Legacy prompt completion (including fill-in-the-middle via `suffix`).
//! Responses share the chat response shape, with each choice carrying `text`.

use crate::api::chat::{StreamOptions, DEEPSEEK_CHAT, DEFAULT_MAX_TOKENS};
use serde::{Deserialize, Serialize};

/// Prompt completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,

    pub model: String,

    /// Echo the prompt back in the output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,

    pub frequency_penalty: f64,

    pub max_tokens: u32,

    pub presence_penalty: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Text that follows the completion (fill-in-the-middle)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,

    pub temperature: f64,

    pub top_p: f64,

    /// Number of most likely tokens to report per position, at most 20
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
}

impl CompletionRequest {
    /// Create a new completion request against the default model
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEEPSEEK_CHAT.to_string(),
            echo: None,
            frequency_penalty: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            presence_penalty: 0.0,
            stop: None,
            suffix: None,
            stream_options: None,
            temperature: 1.0,
            top_p: 1.0,
            logprobs: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}
