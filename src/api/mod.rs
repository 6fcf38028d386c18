//! API Module
//!
//! Wire records for the DeepSeek endpoints and SSE stream decoding.

pub mod account;
pub mod chat;
pub mod completion;
pub mod response;
pub mod streaming;

use serde::Serialize;

pub use account::{Model, ModelResponse, UserBalance, UserResponse};
pub use chat::{
    ChatRequest, FunctionCall, FunctionDefinition, Message, ResponseFormat, Role, StreamOptions,
    Tool, ToolCall, ToolChoice, ToolChoiceFunction, DEEPSEEK_CHAT, DEEPSEEK_CODER,
    DEEPSEEK_REASONER, DEFAULT_MAX_TOKENS,
};
pub use completion::CompletionRequest;
pub use response::{
    ChatResponse, Choice, Delta, FinishReason, FunctionDelta, Logprobs, TokenDetails,
    TokenLogprob, ToolCallDelta, TopLogprob, Usage,
};
pub use streaming::{
    decode_sse, decode_sse_with_usage, parse_sse_line, ChoiceStream, SseLine, StreamAccumulator,
    StreamUsage,
};

/// Request body as sent on the wire: the caller's request plus the `stream`
/// flag matching the call being made.
#[derive(Debug, Serialize)]
pub(crate) struct Payload<'a, T: Serialize> {
    #[serde(flatten)]
    request: &'a T,

    stream: bool,
}

impl<'a, T: Serialize> Payload<'a, T> {
    pub(crate) fn new(request: &'a T, stream: bool) -> Self {
        Self { request, stream }
    }
}
