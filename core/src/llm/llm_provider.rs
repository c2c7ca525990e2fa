// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatRequest, LLMStream, error::LLMResult};

/// Transport seam between the chat node and the remote API
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    /// Send a non-streamed completion request and return the raw JSON body
    async fn chat(&self, request: &ChatRequest) -> LLMResult<Value>;

    /// Send a streamed completion request and return its chunks
    async fn chat_stream(&self, request: &ChatRequest) -> LLMResult<LLMStream>;

    /// Fetch the raw model catalogue
    async fn list_models(&self) -> LLMResult<Value>;

    /// Get the provider name for this client
    fn get_provider_name(&self) -> &str;
}
