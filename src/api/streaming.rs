//! Streaming Support
//!
//! Decodes Server-Sent Events (SSE) bodies from the chat and completion
//! endpoints into a lazy sequence of choices.
//!
//! Each body line is read only when the consumer polls for the next item, so
//! the decoder never runs ahead of its caller. The sequence ends on the
//! `[DONE]` sentinel, at end of body, or when the cancellation token fires;
//! the underlying reader is dropped on every one of those paths.

use crate::api::chat::{FunctionCall, Message, Role, ToolCall};
use crate::api::response::{ChatResponse, Choice, FinishReason, Usage};
use crate::error::{DeepSeekError, Result};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

/// Field name that prefixes every payload line
const DATA_PREFIX: &str = "data:";

/// Payload that terminates the stream
const DONE_SENTINEL: &str = "[DONE]";

/// Lazily decoded choices of a streaming call
pub type ChoiceStream = BoxStream<'static, Result<Choice>>;

/// Token usage reported by a stream.
///
/// With `include_usage` the server sends usage on a trailing chunk that has
/// no choices, so it never surfaces as a stream item. The decoder stores it
/// here instead; read it once the stream has ended.
#[derive(Debug, Clone, Default)]
pub struct StreamUsage {
    inner: Arc<Mutex<Option<Usage>>>,
}

impl StreamUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent usage seen on the stream
    pub fn get(&self) -> Option<Usage> {
        self.inner.lock().clone()
    }

    fn set(&self, usage: Usage) {
        *self.inner.lock() = Some(usage);
    }
}

/// Classification of one SSE body line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Blank, keep-alive comment, or a non-data field
    Skip,

    /// The `[DONE]` sentinel
    Done,

    /// A decoded chunk
    Chunk(ChatResponse),
}

/// Parse one SSE line.
///
/// Only `data:` lines carry payloads; everything else (`: keep-alive`,
/// `event:`, `id:`, `retry:`, blank separators) is skipped.
pub fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.trim_start().strip_prefix(DATA_PREFIX) else {
        return Ok(SseLine::Skip);
    };

    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == DONE_SENTINEL {
        return Ok(SseLine::Done);
    }

    let chunk: ChatResponse = serde_json::from_str(data)?;
    Ok(SseLine::Chunk(chunk))
}

/// Decode an SSE body into choices.
///
/// Emits the first choice of every chunk; chunks without choices are
/// dropped. A read or decode failure is yielded once as the final item.
pub fn decode_sse<R>(reader: R, cancel: CancellationToken) -> ChoiceStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    decode_sse_with_usage(reader, cancel, StreamUsage::new())
}

/// Like [`decode_sse`], also recording any chunk-level usage into `usage`
pub fn decode_sse_with_usage<R>(
    reader: R,
    cancel: CancellationToken,
    usage: StreamUsage,
) -> ChoiceStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let choices = stream! {
        let mut lines = reader.lines();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                line = lines.next_line() => Some(line),
            };

            let line = match next {
                None => {
                    tracing::debug!("stream cancelled by caller");
                    break;
                }
                Some(Ok(Some(line))) => line,
                Some(Ok(None)) => {
                    tracing::debug!("stream body ended without sentinel");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "failed to read stream body");
                    yield Err(DeepSeekError::from(e));
                    break;
                }
            };

            match parse_sse_line(&line) {
                Ok(SseLine::Skip) => {
                    tracing::trace!(%line, "skipping line");
                }
                Ok(SseLine::Done) => {
                    tracing::debug!("stream finished");
                    break;
                }
                Ok(SseLine::Chunk(chunk)) => {
                    if let Some(reported) = chunk.usage {
                        usage.set(reported);
                    }
                    match chunk.choices.into_iter().next() {
                        Some(choice) => yield Ok(choice),
                        None => tracing::trace!(id = %chunk.id, "skipping chunk without choices"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed stream chunk");
                    yield Err(e);
                    break;
                }
            }
        }
    };

    choices.boxed()
}

/// Accumulator for streamed choices
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    /// Accumulated content
    pub content: String,

    /// Accumulated reasoning content
    pub reasoning_content: String,

    /// Accumulated tool calls
    pub tool_calls: Vec<ToolCallAccumulator>,

    /// Role from first chunk
    pub role: Option<Role>,

    /// Finish reason from last chunk
    pub finish_reason: Option<FinishReason>,

    /// Usage from the stream's trailing chunk
    pub usage: Option<Usage>,
}

/// Accumulator for a single tool call
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub call_type: String,
    pub name: String,
    pub arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a choice stream into one assistant message
    pub async fn collect(mut choices: ChoiceStream) -> Result<(Message, Option<FinishReason>)> {
        let mut acc = Self::new();
        while let Some(choice) = choices.next().await {
            acc.push(&choice?);
        }
        let finish_reason = acc.finish_reason;
        Ok((acc.into_message(), finish_reason))
    }

    /// Drain a choice stream, then take the usage its decoder recorded
    pub async fn collect_with_usage(
        mut choices: ChoiceStream,
        usage: &StreamUsage,
    ) -> Result<Self> {
        let mut acc = Self::new();
        while let Some(choice) = choices.next().await {
            acc.push(&choice?);
        }
        acc.usage = usage.get();
        Ok(acc)
    }

    /// Fold one decoded choice into the accumulator
    pub fn push(&mut self, choice: &Choice) {
        if let Some(delta) = &choice.delta {
            if self.role.is_none() {
                self.role = delta.role;
            }

            if let Some(content) = &delta.content {
                self.content.push_str(content);
            }

            if let Some(reasoning) = &delta.reasoning_content {
                self.reasoning_content.push_str(reasoning);
            }

            for tc_delta in delta.tool_calls.iter().flatten() {
                let idx = tc_delta.index as usize;

                while self.tool_calls.len() <= idx {
                    self.tool_calls.push(ToolCallAccumulator::default());
                }

                let tc = &mut self.tool_calls[idx];

                if let Some(id) = &tc_delta.id {
                    tc.id = id.clone();
                }
                if let Some(call_type) = &tc_delta.call_type {
                    tc.call_type = call_type.clone();
                }
                if let Some(func) = &tc_delta.function {
                    if let Some(name) = &func.name {
                        tc.name.push_str(name);
                    }
                    if let Some(args) = &func.arguments {
                        tc.arguments.push_str(args);
                    }
                }
            }
        } else if let Some(text) = &choice.text {
            self.content.push_str(text);
        }

        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }
    }

    /// Convert to a final Message
    pub fn into_message(self) -> Message {
        let tool_calls = if self.tool_calls.is_empty() {
            None
        } else {
            Some(
                self.tool_calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        call_type: tc.call_type,
                        function: FunctionCall {
                            name: tc.name,
                            arguments: tc.arguments,
                        },
                    })
                    .collect(),
            )
        };

        let reasoning_content =
            (!self.reasoning_content.is_empty()).then_some(self.reasoning_content);

        Message {
            role: self.role.unwrap_or(Role::Assistant),
            content: self.content,
            name: None,
            tool_call_id: None,
            prefix: None,
            reasoning_content,
            tool_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::{Delta, FunctionDelta, ToolCallDelta};
    use bytes::Bytes;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio_util::io::StreamReader;

    fn chunk_line(id: &str, content: &str) -> String {
        format!(
            r#"data: {{"id":"{id}","object":"chat.completion.chunk","created":1718345013,"model":"deepseek-chat","choices":[{{"index":0,"delta":{{"content":"{content}"}},"finish_reason":null}}]}}"#
        )
    }

    /// Reader that hands out `parts` one read at a time
    fn reader_from(parts: Vec<String>) -> StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes> {
        let parts = futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p)))).boxed();
        StreamReader::new(parts)
    }

    async fn drain(mut choices: ChoiceStream) -> Vec<Result<Choice>> {
        let mut out = Vec::new();
        while let Some(item) = choices.next().await {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_parse_sse_line() {
        let line = chunk_line("chatcmpl-123", "Hello");

        match parse_sse_line(&line).unwrap() {
            SseLine::Chunk(chunk) => {
                assert_eq!(chunk.id, "chatcmpl-123");
                assert_eq!(chunk.choices[0].content(), Some("Hello"));
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sse_done() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line("data: [DONE]  ").unwrap(), SseLine::Done);
    }

    #[test]
    fn test_parse_sse_skips_non_data_lines() {
        for line in ["", "   ", ": keep-alive", "event: message", "id: 7", "retry: 1000", "data:   "] {
            assert_eq!(parse_sse_line(line).unwrap(), SseLine::Skip, "line {line:?}");
        }
    }

    #[test]
    fn test_parse_sse_malformed_json() {
        let err = parse_sse_line("data: {\"id\":").unwrap_err();
        assert!(matches!(err, DeepSeekError::Json(_)));
    }

    #[tokio::test]
    async fn test_single_chunk_then_done() {
        let body = format!("{}\n\ndata: [DONE]\n", chunk_line("a", "Hi"));
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().content(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_blank_and_comment_lines_ignored() {
        let body = format!(
            "{}\n\n: keep-alive\n\n   \n{}\n\ndata: [DONE]\n\n",
            chunk_line("a", "first"),
            chunk_line("b", "second")
        );
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        let contents: Vec<_> = items
            .iter()
            .map(|c| c.as_ref().unwrap().content().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_chunk_without_choices_skipped() {
        let empty = r#"data: {"id":"u","object":"chat.completion.chunk","created":1,"model":"deepseek-chat","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#;
        let body = format!(
            "{}\n\n{empty}\n\n{}\n\ndata: [DONE]\n\n",
            chunk_line("a", "one"),
            chunk_line("b", "two")
        );
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_ref().unwrap().content(), Some("two"));
    }

    #[tokio::test]
    async fn test_nothing_read_after_sentinel() {
        let body = format!(
            "{}\n\ndata: [DONE]\n\n{}\n\n",
            chunk_line("a", "kept"),
            chunk_line("b", "ignored")
        );
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().content(), Some("kept"));
    }

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let line = chunk_line("a", "split");
        let (head, tail) = line.split_at(20);

        let mock = tokio_test::io::Builder::new()
            .read(head.as_bytes())
            .read(tail.as_bytes())
            .read(b"\r\n\r\ndata: [DO")
            .read(b"NE]\r\n")
            .build();

        let items = drain(decode_sse(BufReader::new(mock), CancellationToken::new())).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().content(), Some("split"));
    }

    #[tokio::test]
    async fn test_end_of_body_without_sentinel() {
        let body = format!("{}\n\n", chunk_line("a", "tail"));
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn test_malformed_chunk_ends_stream_with_error() {
        let body = format!(
            "{}\n\ndata: {{not json}}\n\n{}\n\n",
            chunk_line("a", "ok"),
            chunk_line("b", "never")
        );
        let items = drain(decode_sse(reader_from(vec![body]), CancellationToken::new())).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(DeepSeekError::Json(_))));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_stream_error() {
        let parts = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
            b"data: \xff\xfe\n",
        ))])
        .boxed();
        let items = drain(decode_sse(StreamReader::new(parts), CancellationToken::new())).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(DeepSeekError::Stream(_))));
    }

    #[tokio::test]
    async fn test_cancel_after_first_item() {
        let (client, mut server) = tokio::io::duplex(4096);
        let cancel = CancellationToken::new();
        let mut choices = decode_sse(BufReader::new(client), cancel.clone());

        server
            .write_all(format!("{}\n\n", chunk_line("a", "first")).as_bytes())
            .await
            .unwrap();

        let first = choices.next().await.unwrap().unwrap();
        assert_eq!(first.content(), Some("first"));

        cancel.cancel();
        server
            .write_all(format!("{}\n\n", chunk_line("b", "second")).as_bytes())
            .await
            .unwrap();

        assert!(choices.next().await.is_none());
        assert!(choices.next().await.is_none());

        // The read half is released once the stream is gone.
        drop(choices);
        let mut failed = false;
        for _ in 0..4 {
            if server.write_all(&[b'x'; 4096]).await.is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[tokio::test]
    async fn test_cancel_before_first_read() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let body = format!("{}\n\n", chunk_line("a", "unseen"));
        let items = drain(decode_sse(reader_from(vec![body]), cancel)).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_usage_from_trailing_chunk() {
        let trailing = r#"data: {"id":"u","object":"chat.completion.chunk","created":1,"model":"deepseek-chat","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#;
        let body = format!("{}\n\n{trailing}\n\ndata: [DONE]\n\n", chunk_line("a", "Hi"));

        let usage = StreamUsage::new();
        let choices =
            decode_sse_with_usage(reader_from(vec![body]), CancellationToken::new(), usage.clone());
        let acc = StreamAccumulator::collect_with_usage(choices, &usage)
            .await
            .unwrap();

        assert_eq!(acc.content, "Hi");
        let reported = acc.usage.unwrap();
        assert_eq!(reported.prompt_tokens, 5);
        assert_eq!(reported.total_tokens, 7);
    }

    #[tokio::test]
    async fn test_no_usage_without_include_usage() {
        let body = format!("{}\n\ndata: [DONE]\n\n", chunk_line("a", "Hi"));

        let usage = StreamUsage::new();
        let items = drain(decode_sse_with_usage(
            reader_from(vec![body]),
            CancellationToken::new(),
            usage.clone(),
        ))
        .await;

        assert_eq!(items.len(), 1);
        assert!(usage.get().is_none());
    }

    #[tokio::test]
    async fn test_completion_chunks_decode_as_text() {
        let body = concat!(
            r#"data: {"id":"t","object":"text_completion","created":1,"model":"deepseek-chat","choices":[{"index":0,"text":"    if a","finish_reason":null}]}"#,
            "\n\n",
            r#"data: {"id":"t","object":"text_completion","created":1,"model":"deepseek-chat","choices":[{"index":0,"text":" <= 1:","finish_reason":"stop"}]}"#,
            "\n\ndata: [DONE]\n\n"
        );
        let choices = decode_sse(reader_from(vec![body.to_string()]), CancellationToken::new());

        let (message, finish) = StreamAccumulator::collect(choices).await.unwrap();
        assert_eq!(message.content, "    if a <= 1:");
        assert_eq!(finish, Some(FinishReason::Stop));
    }

    #[test]
    fn test_stream_accumulator() {
        let mut acc = StreamAccumulator::new();

        acc.push(&Choice {
            index: 0,
            finish_reason: None,
            message: None,
            delta: Some(Delta {
                role: Some(Role::Assistant),
                content: None,
                reasoning_content: Some("The user greets".to_string()),
                tool_calls: None,
            }),
            text: None,
            logprobs: None,
        });
        acc.push(&Choice {
            index: 0,
            finish_reason: None,
            message: None,
            delta: Some(Delta {
                content: Some("Hello".to_string()),
                ..Delta::default()
            }),
            text: None,
            logprobs: None,
        });
        acc.push(&Choice {
            index: 0,
            finish_reason: Some(FinishReason::Stop),
            message: None,
            delta: Some(Delta {
                content: Some(" World".to_string()),
                ..Delta::default()
            }),
            text: None,
            logprobs: None,
        });

        assert_eq!(acc.content, "Hello World");
        assert_eq!(acc.role, Some(Role::Assistant));
        assert_eq!(acc.finish_reason, Some(FinishReason::Stop));

        let message = acc.into_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Hello World");
        assert_eq!(message.reasoning_content.as_deref(), Some("The user greets"));
        assert!(message.tool_calls.is_none());
    }

    #[test]
    fn test_stream_accumulator_tool_calls() {
        let mut acc = StreamAccumulator::new();

        for (id, name, args) in [
            (Some("call_0"), Some("get_weather"), "{\"city\":"),
            (None, None, "\"Hangzhou\"}"),
        ] {
            acc.push(&Choice {
                index: 0,
                finish_reason: None,
                message: None,
                delta: Some(Delta {
                    tool_calls: Some(vec![ToolCallDelta {
                        index: 0,
                        id: id.map(str::to_string),
                        call_type: id.map(|_| "function".to_string()),
                        function: Some(FunctionDelta {
                            name: name.map(str::to_string),
                            arguments: Some(args.to_string()),
                        }),
                    }]),
                    ..Delta::default()
                }),
                text: None,
                logprobs: None,
            });
        }

        let message = acc.into_message();
        let calls = message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, "{\"city\":\"Hangzhou\"}");
    }
}
