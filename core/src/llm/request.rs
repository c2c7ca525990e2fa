// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    High,
    #[default]
    Medium,
    Low,
}

/// `reasoning` block of a chat request
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReasoningRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormatType {
    JsonObject,
    Text,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: ResponseFormatType,
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_parameters: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_data_retention: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, temperature: f64) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            frequency_penalty: None,
            logit_bias: None,
            max_tokens: None,
            n: None,
            presence_penalty: None,
            response_format: None,
            seed: None,
            stop: None,
            top_p: None,
            reasoning: None,
            stream: None,
            route: None,
            require_parameters: None,
            zero_data_retention: None,
            provider: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_reasoning(mut self, reasoning: ReasoningRequest) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream.then_some(true);
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request_omits_unset_fields() {
        let request = ChatRequest::new("openai/gpt-4o", vec![ChatMessage::user("Hi")], 0.9);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "openai/gpt-4o",
                "messages": [{"role": "user", "content": "Hi"}],
                "temperature": 0.9
            })
        );
        assert!(!request.is_streaming());
    }

    #[test]
    fn test_streaming_request_structure() {
        let request = ChatRequest::new("test-model", vec![], 0.7)
            .with_max_tokens(100)
            .with_stream(true)
            .with_reasoning(ReasoningRequest {
                effort: Some(ReasoningEffort::High),
                exclude: Some(true),
                ..Default::default()
            });

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["reasoning"], json!({"effort": "high", "exclude": true}));
        assert!(request.is_streaming());

        let not_streaming = ChatRequest::new("test-model", vec![], 0.7).with_stream(false);
        assert!(serde_json::to_value(&not_streaming).unwrap().get("stream").is_none());
    }

    #[test]
    fn test_response_format_wire_name() {
        let format = ResponseFormat {
            format_type: ResponseFormatType::JsonObject,
        };
        assert_eq!(serde_json::to_value(format).unwrap(), json!({"type": "json_object"}));
    }
}
