// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Per-item parameters of the chat node.
//!
//! Field names on the wire match the node's parameter names (`additionalFields`,
//! `promptCaching.caching.cacheSystemPrompt`, ...) so items produced by a
//! workflow host deserialize directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{ReasoningEffort, ResponseFormatType};

pub const DEFAULT_TEMPERATURE: f64 = 0.9;

/// A JSON-typed parameter: either JSON text or an already-decoded value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonInput {
    Encoded(String),
    Inline(Value),
}

impl JsonInput {
    pub fn empty_array() -> Self {
        JsonInput::Encoded("[]".to_string())
    }

    pub fn empty_object() -> Self {
        JsonInput::Encoded("{}".to_string())
    }

    pub fn parse(&self) -> Result<Value, serde_json::Error> {
        match self {
            JsonInput::Encoded(text) => serde_json::from_str(text),
            JsonInput::Inline(value) => Ok(value.clone()),
        }
    }

    /// The parameter as plain text, for fields that are JSON-typed in the
    /// form but consumed as a string
    pub fn as_text(&self) -> String {
        match self {
            JsonInput::Encoded(text) => text.clone(),
            JsonInput::Inline(Value::Null) => String::new(),
            JsonInput::Inline(Value::String(text)) => text.clone(),
            JsonInput::Inline(value) => value.to_string(),
        }
    }
}

impl Default for JsonInput {
    fn default() -> Self {
        JsonInput::empty_array()
    }
}

impl From<Value> for JsonInput {
    fn from(value: Value) -> Self {
        JsonInput::Inline(value)
    }
}

impl From<&str> for JsonInput {
    fn from(text: &str) -> Self {
        JsonInput::Encoded(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatParameters {
    #[serde(default)]
    pub operation: Operation,
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default, rename = "additionalFields")]
    pub additional_fields: AdditionalFields,
    #[serde(default = "JsonInput::empty_array", rename = "conversationHistory")]
    pub conversation_history: JsonInput,
    #[serde(default, rename = "promptCaching")]
    pub prompt_caching: PromptCaching,
    #[serde(default)]
    pub reasoning: Reasoning,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, rename = "providerRouting")]
    pub provider_routing: ProviderRouting,
    #[serde(default = "JsonInput::empty_array")]
    pub images: JsonInput,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl ChatParameters {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: Operation::Chat,
            model: model.into(),
            system_prompt: String::new(),
            message: message.into(),
            temperature: DEFAULT_TEMPERATURE,
            additional_fields: AdditionalFields::default(),
            conversation_history: JsonInput::empty_array(),
            prompt_caching: PromptCaching::default(),
            reasoning: Reasoning::default(),
            stream: false,
            provider_routing: ProviderRouting::default(),
            images: JsonInput::empty_array(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_history(mut self, history: impl Into<JsonInput>) -> Self {
        self.conversation_history = history.into();
        self
    }

    pub fn with_images(mut self, images: impl Into<JsonInput>) -> Self {
        self.images = images.into();
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_additional_fields(mut self, fields: AdditionalFields) -> Self {
        self.additional_fields = fields;
        self
    }

    pub fn with_caching(mut self, caching: CachingOptions) -> Self {
        self.prompt_caching.caching = Some(caching);
        self
    }

    pub fn with_reasoning(mut self, config: ReasoningOptions) -> Self {
        self.reasoning.config = Some(config);
        self
    }

    pub fn with_routing(mut self, routing: RoutingOptions) -> Self {
        self.provider_routing.routing = Some(routing);
        self
    }
}

/// Optional sampling and output fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdditionalFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// JSON object mapping token ids to bias values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<JsonInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormatParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Comma separated stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormatParameter {
    #[serde(default)]
    pub format: Option<ResponseFormatValues>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormatValues {
    #[serde(default, rename = "type")]
    pub format_type: Option<ResponseFormatType>,
}

impl ResponseFormatParameter {
    pub fn new(format_type: ResponseFormatType) -> Self {
        Self {
            format: Some(ResponseFormatValues {
                format_type: Some(format_type),
            }),
        }
    }

    pub fn format_type(&self) -> Option<ResponseFormatType> {
        self.format.as_ref()?.format_type
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptCaching {
    #[serde(default)]
    pub caching: Option<CachingOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CachingOptions {
    #[serde(default, rename = "cacheSystemPrompt")]
    pub cache_system_prompt: bool,
    /// Large content appended to the system message behind a cache breakpoint
    #[serde(default, rename = "cacheContent", skip_serializing_if = "Option::is_none")]
    pub cache_content: Option<JsonInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reasoning {
    #[serde(default)]
    pub config: Option<ReasoningOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_effort")]
    pub effort: Option<ReasoningEffort>,
    /// Explicit reasoning budget; anything above zero wins over `effort`
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default)]
    pub exclude: bool,
}

fn default_effort() -> Option<ReasoningEffort> {
    Some(ReasoningEffort::Medium)
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            effort: default_effort(),
            max_tokens: 0,
            exclude: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderRouting {
    #[serde(default)]
    pub routing: Option<RoutingOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingOptions {
    /// `""` for default routing, `"fallback"` for fallback routing
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub require_parameters: bool,
    #[serde(default)]
    pub zero_data_retention: bool,
    /// Provider preferences, e.g. `{"order": ["OpenAI", "Anthropic"]}`
    #[serde(default = "default_provider_preferences")]
    pub provider: Option<JsonInput>,
}

fn default_provider_preferences() -> Option<JsonInput> {
    Some(JsonInput::empty_object())
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            route: String::new(),
            require_parameters: false,
            zero_data_retention: false,
            provider: default_provider_preferences(),
        }
    }
}
