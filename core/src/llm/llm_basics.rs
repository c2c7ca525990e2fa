// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use crate::llm::error::LLMResult;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, pin::Pin};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from system
    System,
    /// Message from developer (newer OpenAI models)
    Developer,
    /// Message from the user/human
    User,
    /// Message from the AI assistant
    Assistant,
    /// Message containing tool results
    Tool,
    /// Legacy function role
    Function,
}

impl MessageRole {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::Developer => "developer",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
            MessageRole::Function => "function",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prompt-cache breakpoint understood by Anthropic and Gemini routes.
///
/// Provider extensions such as `ttl` ride along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub control_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CacheControl {
    pub const EPHEMERAL: &'static str = "ephemeral";

    pub fn ephemeral() -> Self {
        Self {
            control_type: Self::EPHEMERAL.to_string(),
            extra: Map::new(),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.control_type == Self::EPHEMERAL
    }
}

/// Vision detail level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

impl ImageDetail {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "auto" => Some(ImageDetail::Auto),
            "low" => Some(ImageDetail::Low),
            "high" => Some(ImageDetail::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of a multi-part message content array.
///
/// Keys this crate does not model are kept in `extra` so caller-supplied
/// history is sent back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    #[serde(rename = "image_url")]
    ImageUrl {
        image_url: ImageUrl,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            cache_control: None,
            extra: Map::new(),
        }
    }

    /// A text part carrying an ephemeral cache breakpoint
    pub fn cached_text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            cache_control: Some(CacheControl::ephemeral()),
            extra: Map::new(),
        }
    }

    pub fn image(url: impl Into<String>, detail: Option<ImageDetail>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail,
                extra: Map::new(),
            },
            cache_control: None,
            extra: Map::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn cache_control(&self) -> Option<&CacheControl> {
        match self {
            ContentPart::Text { cache_control, .. } | ContentPart::ImageUrl { cache_control, .. } => {
                cache_control.as_ref()
            }
        }
    }

    pub fn set_cache_control(&mut self, control: CacheControl) {
        match self {
            ContentPart::Text { cache_control, .. } | ContentPart::ImageUrl { cache_control, .. } => {
                *cache_control = Some(control)
            }
        }
    }
}

/// Message content: a plain string or an array of typed parts.
///
/// Content shapes this crate does not model (audio, files, ...) are kept
/// verbatim in `Other` so history round-trips untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(Value),
}

impl MessageContent {
    /// Convert to the array form used when images or cache markers are merged in.
    ///
    /// Unmodelled content cannot be merged and is dropped.
    pub fn into_parts(self) -> Vec<ContentPart> {
        match self {
            MessageContent::Text(text) => vec![ContentPart::text(text)],
            MessageContent::Parts(parts) => parts,
            MessageContent::Other(value) => {
                log::debug!("Dropping unsupported message content while merging parts: {}", value);
                Vec::new()
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_parts(&self) -> Option<&[ContentPart]> {
        match self {
            MessageContent::Parts(parts) => Some(parts),
            _ => None,
        }
    }
}

/// Chat message in OpenRouter's wire format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Passed through as-is; the node never inspects tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<Vec<Value>>,
    /// Any other fields present in caller-supplied history
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new_text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
            name: None,
            tool_calls: None,
            tool_call_id: None,
            reasoning_details: None,
            extra: Map::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new_text(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new_text(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new_text(MessageRole::Assistant, text)
    }

    /// Take the content out as parts, leaving the message empty
    pub fn take_parts(&mut self) -> Vec<ContentPart> {
        self.content
            .take()
            .map(MessageContent::into_parts)
            .unwrap_or_default()
    }

    pub fn set_parts(&mut self, parts: Vec<ContentPart>) {
        self.content = Some(MessageContent::Parts(parts));
    }
}

/// Decoded `data:` payload of a streamed completion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl StreamChunk {
    fn first_choice(&self) -> Option<&StreamChoice> {
        self.choices.first()
    }

    pub fn content(&self) -> Option<&str> {
        self.first_choice()?.delta.as_ref()?.content.as_deref()
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.first_choice()?.delta.as_ref()?.reasoning.as_deref()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_choice()?.finish_reason.as_deref()
    }
}

/// Type alias for streaming response
pub type LLMStream = Pin<Box<dyn Stream<Item = LLMResult<StreamChunk>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_role() {
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Developer.as_str(), "developer");
        assert_eq!(format!("{}", MessageRole::Assistant), "assistant");

        let message = ChatMessage::user("Hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_content_part_wire_format() {
        let part = ContentPart::cached_text("big document");
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"type": "text", "text": "big document", "cache_control": {"type": "ephemeral"}})
        );

        let image = ContentPart::image("https://example.com/a.png", Some(ImageDetail::High));
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({"type": "image_url", "image_url": {"url": "https://example.com/a.png", "detail": "high"}})
        );

        let bare = ContentPart::image("https://example.com/b.png", None);
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({"type": "image_url", "image_url": {"url": "https://example.com/b.png"}})
        );
    }

    #[test]
    fn test_history_message_keeps_unknown_fields() {
        let raw = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "lookup", "arguments": "{}"}}],
            "refusal": null,
            "annotations": []
        });

        let message: ChatMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls.as_ref().unwrap()[0]["function"]["name"], "lookup");
        assert!(message.extra.contains_key("annotations"));

        let back = serde_json::to_value(&message).unwrap();
        assert_eq!(back["annotations"], json!([]));
        assert_eq!(back["tool_calls"][0]["id"], "call_1");
    }

    #[test]
    fn test_unmodelled_content_is_preserved() {
        let raw = json!({
            "role": "user",
            "content": [{"type": "input_audio", "input_audio": {"data": "abc", "format": "wav"}}]
        });

        let message: ChatMessage = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(message.content, Some(MessageContent::Other(_))));
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }

    #[test]
    fn test_unusual_tool_calls_still_decode() {
        let raw = json!({
            "role": "assistant",
            "tool_calls": [{"id": "call_2", "function": {"name": "lookup", "arguments": {"q": "rust"}}}]
        });

        let message: ChatMessage = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }

    #[test]
    fn test_part_extensions_round_trip() {
        let raw = json!([
            {"type": "text", "text": "Big doc", "cache_control": {"type": "ephemeral", "ttl": "1h"}},
            {"type": "image_url", "image_url": {"url": "https://example.com/a.png", "format": "png"}, "index": 1}
        ]);

        let parts: Vec<ContentPart> = serde_json::from_value(raw.clone()).unwrap();
        let control = parts[0].cache_control().unwrap();
        assert!(control.is_ephemeral());
        assert_eq!(control.extra["ttl"], "1h");
        assert_eq!(serde_json::to_value(&parts).unwrap(), raw);
    }

    #[test]
    fn test_take_parts() {
        let mut message = ChatMessage::system("Be brief.");
        let parts = message.take_parts();
        assert_eq!(parts, vec![ContentPart::text("Be brief.")]);
        assert!(message.content.is_none());

        let mut empty = ChatMessage::system("");
        empty.content = None;
        assert!(empty.take_parts().is_empty());
    }

    #[test]
    fn test_stream_chunk_accessors() {
        let chunk: StreamChunk = serde_json::from_value(json!({
            "model": "openai/gpt-4o",
            "choices": [{"delta": {"content": "Hi", "reasoning": "think"}, "finish_reason": null}]
        }))
        .unwrap();

        assert_eq!(chunk.content(), Some("Hi"));
        assert_eq!(chunk.reasoning(), Some("think"));
        assert_eq!(chunk.finish_reason(), None);
        assert_eq!(chunk.model.as_deref(), Some("openai/gpt-4o"));

        let empty: StreamChunk = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.content(), None);
    }

    #[test]
    fn test_image_detail_parse() {
        assert_eq!(ImageDetail::parse("HIGH"), Some(ImageDetail::High));
        assert_eq!(ImageDetail::parse("low"), Some(ImageDetail::Low));
        assert_eq!(ImageDetail::parse("ultra"), None);
    }
}
