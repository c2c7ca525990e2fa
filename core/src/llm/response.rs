// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::llm::error::{LLMError, LLMResult};

/// Normalized result of one chat item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatOutput {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_discount: Option<f64>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streamed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Value>,
    #[serde(default)]
    cache_discount: Option<f64>,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_details: Option<Value>,
}

/// Normalize a non-streamed completion body.
///
/// Only the first choice is surfaced; the raw body is kept in `full_response`.
pub fn normalize_completion(raw: Value) -> LLMResult<ChatOutput> {
    let parsed: CompletionResponse =
        serde_json::from_value(raw.clone()).map_err(|_| LLMError::InvalidResponse)?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(LLMError::InvalidResponse)?;
    let message = choice.message.ok_or(LLMError::InvalidResponse)?;

    let response = message
        .content
        .as_ref()
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if let Some(summary) = parsed.usage.as_ref().and_then(UsageSummary::from_value) {
        log::debug!("Completion usage: {}", summary);
    }

    Ok(ChatOutput {
        response,
        model: parsed.model,
        usage: parsed.usage,
        reasoning: message.reasoning.filter(|reasoning| !reasoning.is_empty()),
        reasoning_details: message.reasoning_details,
        cache_discount: parsed.cache_discount,
        finish_reason: choice.finish_reason,
        streamed: None,
        full_response: Some(raw),
    })
}

/// Token accounting pulled out of a raw `usage` object for logging
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UsageSummary {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: Option<u64>,
}

impl UsageSummary {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn cached_tokens(&self) -> u64 {
        self.prompt_tokens_details
            .as_ref()
            .and_then(|details| details.cached_tokens)
            .unwrap_or(0)
    }

    pub fn reasoning_tokens(&self) -> u64 {
        self.completion_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens)
            .unwrap_or(0)
    }
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Usage(prompt_tokens={}, completion_tokens={}, total_tokens={}, cached_tokens={}, reasoning_tokens={})",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.cached_tokens(),
            self.reasoning_tokens()
        )
    }
}
