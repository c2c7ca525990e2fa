// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

pub mod error;
pub mod llm_basics;
pub mod llm_provider;
pub mod models;
pub mod openrouter_client;
pub mod request;
pub mod response;
pub mod sse;

pub use error::{LLMError, LLMResult};
pub use llm_basics::{
    CacheControl, ChatMessage, ContentPart, ImageDetail, ImageUrl, LLMStream, MessageContent,
    MessageRole, StreamChunk,
};
pub use llm_provider::ChatCompletionProvider;
pub use models::{ModelOption, OpenRouterModel};
pub use openrouter_client::OpenRouterClient;
pub use request::{
    ChatRequest, ReasoningEffort, ReasoningRequest, ResponseFormat, ResponseFormatType,
};
pub use response::{ChatOutput, UsageSummary};
pub use sse::StreamAggregator;
