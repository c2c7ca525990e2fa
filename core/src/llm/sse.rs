// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Server-Sent Events handling for streamed chat completions.
//!
//! OpenRouter answers a `stream: true` request with `data: {json}` lines,
//! interleaved with `: OPENROUTER PROCESSING` keepalive comments, and
//! terminated by `data: [DONE]`. The whole body is read first and then split
//! into chunks, which are folded into a single [`ChatOutput`].

use futures::{StreamExt, stream};
use serde_json::{Map, Value};

use crate::llm::error::LLMResult;
use crate::llm::response::ChatOutput;
use crate::llm::{LLMStream, StreamChunk};

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Parse an SSE body into completion chunks, stopping at `[DONE]`.
///
/// Lines that are not `data: ` events are ignored, as are payloads that do
/// not decode as a chunk.
pub fn parse_event_stream(body: &str) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();

    for line in body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        if data == DONE_MARKER {
            break;
        }

        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => log::debug!("Skipping undecodable stream chunk: {}", e),
        }
    }

    chunks
}

/// Wrap parsed chunks in the stream type handed out by providers
pub fn into_stream(chunks: Vec<StreamChunk>) -> LLMStream {
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}

/// Running totals over a chunk stream
#[derive(Debug, Clone, Default)]
pub struct StreamAggregator {
    content: String,
    reasoning: String,
    finish_reason: Option<String>,
    usage: Option<Value>,
    model: Option<String>,
    chunk_count: usize,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &StreamChunk) {
        self.chunk_count += 1;

        if let Some(content) = chunk.content() {
            self.content.push_str(content);
        }
        if let Some(reasoning) = chunk.reasoning() {
            self.reasoning.push_str(reasoning);
        }
        if let Some(finish_reason) = chunk.finish_reason().filter(|reason| !reason.is_empty()) {
            self.finish_reason = Some(finish_reason.to_string());
        }
        if let Some(usage) = chunk.usage.as_ref().filter(|usage| !usage.is_null()) {
            self.usage = Some(usage.clone());
        }
        if let Some(model) = chunk.model.as_ref().filter(|model| !model.is_empty()) {
            self.model = Some(model.clone());
        }
    }

    /// Drain a chunk stream; the first error aborts aggregation
    pub async fn collect(mut stream: LLMStream) -> LLMResult<Self> {
        let mut aggregator = Self::new();
        while let Some(chunk) = stream.next().await {
            aggregator.push(&chunk?);
        }
        Ok(aggregator)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Build the streamed output; `requested_model` stands in when no chunk named one.
    pub fn into_output(self, requested_model: &str) -> ChatOutput {
        ChatOutput {
            response: self.content.trim().to_string(),
            model: Some(self.model.unwrap_or_else(|| requested_model.to_string())),
            usage: Some(self.usage.unwrap_or_else(|| Value::Object(Map::new()))),
            reasoning: (!self.reasoning.is_empty()).then_some(self.reasoning),
            reasoning_details: None,
            cache_discount: None,
            finish_reason: Some(self.finish_reason.unwrap_or_default()),
            streamed: Some(true),
            full_response: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE_STREAM: &str = r#": OPENROUTER PROCESSING

data: {"id":"gen-1","model":"deepseek/deepseek-r1","choices":[{"delta":{"role":"assistant","content":"","reasoning":"Let me "},"finish_reason":null}]}

data: {"id":"gen-1","model":"deepseek/deepseek-r1","choices":[{"delta":{"reasoning":"think."},"finish_reason":null}]}

data: {"id":"gen-1","model":"deepseek/deepseek-r1","choices":[{"delta":{"content":" Hello"},"finish_reason":null}]}

data: {"id":"gen-1","model":"deepseek/deepseek-r1","choices":[{"delta":{"content":" world! "},"finish_reason":"stop"}]}

data: {"id":"gen-1","model":"deepseek/deepseek-r1","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":7,"total_tokens":12}}

data: [DONE]
"#;

    #[test]
    fn test_parse_event_stream() {
        let chunks = parse_event_stream(SAMPLE_STREAM);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].reasoning(), Some("Let me "));
        assert_eq!(chunks[3].finish_reason(), Some("stop"));
        assert!(chunks[4].usage.is_some());
    }

    #[test]
    fn test_done_marker_stops_parsing() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
                    data: [DONE]\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n";
        let chunks = parse_event_stream(body);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content(), Some("a"));
    }

    #[test]
    fn test_crlf_and_bad_lines() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\
                    data: {invalid json}\r\n\
                    data:{\"choices\":[{\"delta\":{\"content\":\"no space\"}}]}\r\n\
                    event: message\r\n\
                    data: 42\r\n\
                    data: [DONE]\r\n";
        let chunks = parse_event_stream(body);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content(), Some("x"));
    }

    #[test]
    fn test_aggregate_stream_output() {
        let mut aggregator = StreamAggregator::new();
        for chunk in parse_event_stream(SAMPLE_STREAM) {
            aggregator.push(&chunk);
        }
        assert_eq!(aggregator.chunk_count(), 5);

        let output = aggregator.into_output("deepseek/deepseek-r1:free");
        assert_eq!(output.response, "Hello world!");
        assert_eq!(output.reasoning.as_deref(), Some("Let me think."));
        assert_eq!(output.model.as_deref(), Some("deepseek/deepseek-r1"));
        assert_eq!(output.finish_reason.as_deref(), Some("stop"));
        assert_eq!(output.usage, Some(json!({"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12})));
        assert_eq!(output.streamed, Some(true));
    }

    #[test]
    fn test_empty_stream_defaults() {
        let output = StreamAggregator::new().into_output("openai/gpt-4o");

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            json!({
                "response": "",
                "model": "openai/gpt-4o",
                "usage": {},
                "finish_reason": "",
                "streamed": true
            })
        );
    }

    #[tokio::test]
    async fn test_collect_from_stream() {
        let stream = into_stream(parse_event_stream(SAMPLE_STREAM));
        let aggregator = StreamAggregator::collect(stream).await.unwrap();
        assert_eq!(aggregator.chunk_count(), 5);
        assert_eq!(aggregator.into_output("m").response, "Hello world!");
    }

    #[tokio::test]
    async fn test_collect_propagates_errors() {
        let chunks: Vec<LLMResult<StreamChunk>> = vec![
            Ok(StreamChunk::default()),
            Err(crate::llm::LLMError::InvalidResponse),
        ];
        let stream: LLMStream = Box::pin(stream::iter(chunks));
        assert!(StreamAggregator::collect(stream).await.is_err());
    }
}
