//! Chat API
//!
//! Request types for the chat completion endpoint.

use serde::{Deserialize, Deserializer, Serialize};

/// Default chat model
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// Reasoning model (emits `reasoning_content` alongside `content`)
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// Code model
pub const DEEPSEEK_CODER: &str = "deepseek-coder";

/// Default upper bound on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// Message text; empty for an assistant prefix that the model should continue
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    /// Optional name for the message author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool call being answered (role `tool` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Ask the model to continue this assistant message (role `assistant` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<bool>,

    /// Chain-of-thought text (role `assistant` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            prefix: None,
            reasoning_content: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant message with the optional prefix-continuation fields
    pub fn assistant_with(
        content: impl Into<String>,
        prefix: Option<bool>,
        reasoning_content: Option<String>,
    ) -> Self {
        Self {
            prefix,
            reasoning_content,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Result of a tool invocation, answering `tool_call_id`
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Set the author name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Servers send `"content": null` on assistant messages that only carry tool calls.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tool call made by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,

    /// Type of tool call (always "function" today)
    #[serde(rename = "type")]
    pub call_type: String,

    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// Tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,

    pub function: FunctionDefinition,
}

impl Tool {
    /// A function tool
    pub fn function(definition: FunctionDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: definition,
        }
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON schema of the arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Tool choice configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// String values: "none", "auto", "required"
    Mode(String),

    /// Specific function
    Function {
        r#type: String,
        function: ToolChoiceFunction,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    pub name: String,
}

/// Output format selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
}

/// Streaming options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Send a final chunk carrying token usage
    pub include_usage: bool,
}

/// Chat completion request.
///
/// The `stream` flag is not part of this type; the client adds it for the
/// call being made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    pub model: String,

    /// In [-2, 2]
    pub frequency_penalty: f64,

    pub max_tokens: u32,

    /// In [-2, 2]
    pub presence_penalty: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Up to 16 sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,

    /// In [0, 2]
    pub temperature: f64,

    pub top_p: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,

    /// In [0, 20]; requires `logprobs`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            model: DEEPSEEK_CHAT.to_string(),
            frequency_penalty: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            presence_penalty: 0.0,
            response_format: None,
            stop: None,
            tools: None,
            tool_choice: None,
            stream_options: None,
            temperature: 1.0,
            top_p: 1.0,
            logprobs: None,
            top_logprobs: None,
        }
    }
}

impl ChatRequest {
    /// Create a new chat request against the default model
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Request a trailing usage chunk when streaming
    pub fn with_usage_in_stream(mut self) -> Self {
        self.stream_options = Some(StreamOptions {
            include_usage: true,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_identifiers() {
        let request = ChatRequest::new(vec![Message::user("fn main")]).with_model(DEEPSEEK_CODER);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "deepseek-coder");
        assert_eq!(DEEPSEEK_CHAT, "deepseek-chat");
        assert_eq!(DEEPSEEK_REASONER, "deepseek-reasoner");
    }

    #[test]
    fn test_role_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::system("be terse").role, Role::System);

        let assistant = Message::assistant("ok");
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.prefix.is_none());
        assert!(assistant.reasoning_content.is_none());
    }

    #[test]
    fn test_assistant_prefix_message() {
        let msg = Message::assistant_with("```python\n", Some(true), None);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["prefix"], true);
        assert!(json.get("reasoning_content").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_tool_message_round_trip() {
        let msg = Message::tool("result", "call_1");
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.role, Role::Tool);
        assert_eq!(decoded.content, "result");
        assert_eq!(decoded.tool_call_id.as_deref(), Some("call_1"));
        assert!(decoded.name.is_none());
        assert!(decoded.prefix.is_none());
        assert!(decoded.reasoning_content.is_none());
        assert!(decoded.tool_calls.is_none());
    }

    #[test]
    fn test_null_content_decodes_as_empty() {
        let json = r#"{
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_0",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"city\":\"Hangzhou\"}"}
            }]
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "");
        assert_eq!(msg.tool_calls.unwrap()[0].function.name, "get_weather");
    }

    #[test]
    fn test_unknown_role_rejected() {
        let json = r#"{"role": "moderator", "content": "x"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn test_chat_request_defaults() {
        let request = ChatRequest::new(vec![Message::user("Hello")]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], DEEPSEEK_CHAT);
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["temperature"], 1.0);
        assert_eq!(json["top_p"], 1.0);
        assert!(json.get("stream").is_none());
        assert!(json.get("response_format").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_chat_request_options_serialization() {
        let request = ChatRequest::new(vec![Message::user("List three colors as JSON")])
            .with_model(DEEPSEEK_REASONER)
            .with_response_format(ResponseFormat::JsonObject)
            .with_stop(vec!["\n\n".to_string()])
            .with_usage_in_stream();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-reasoner");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["stop"][0], "\n\n");
        assert_eq!(json["stream_options"]["include_usage"], true);
    }

    #[test]
    fn test_tool_definition_serialization() {
        let tool = Tool::function(FunctionDefinition {
            name: "get_weather".to_string(),
            description: Some("Get weather of a city".to_string()),
            parameters: Some(serde_json::json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })),
        });

        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "get_weather");
        assert_eq!(json["function"]["parameters"]["required"][0], "city");
    }

    #[test]
    fn test_unicode_is_not_escaped() {
        let msg = Message::user("请翻译'它们害怕极了！'为英语");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("它们害怕极了"));
    }
}
