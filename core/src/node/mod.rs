// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! The "OpenRouter Cached" chat node.
//!
//! A node receives a batch of input items, each carrying its own
//! [`ChatParameters`], and produces one output item per input. Every output
//! records which input it came from through `pairedItem`.
//!
//! # Example usage
//!
//! ```rust,no_run
//! use openrouter_cached_core::config::{ClientConfig, Credentials};
//! use openrouter_cached_core::node::{ChatParameters, ExecuteOptions, OpenRouterCachedNode};
//!
//! # async fn run() -> openrouter_cached_core::llm::LLMResult<()> {
//! let node = OpenRouterCachedNode::from_credentials(
//!     &Credentials::new("sk-or-..."),
//!     &ClientConfig::default(),
//! )?;
//!
//! let items = vec![ChatParameters::new("openai/gpt-4o-mini", "Hello!")];
//! let outputs = node.execute(&items, ExecuteOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod messages;
pub mod params;

use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, Credentials};
use crate::llm::error::LLMResult;
use crate::llm::models::{ModelOption, model_options_from_response};
use crate::llm::response::normalize_completion;
use crate::llm::{ChatCompletionProvider, ChatOutput, OpenRouterClient, StreamAggregator};

pub use builder::build_request;
pub use messages::build_messages;
pub use params::{
    AdditionalFields, CachingOptions, ChatParameters, JsonInput, Operation, PromptCaching,
    ProviderRouting, Reasoning, ReasoningOptions, ResponseFormatParameter, RoutingOptions,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Record a failing item as `{"error": ...}` and keep going instead of aborting
    pub continue_on_fail: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairedItem {
    pub item: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ItemOutput {
    Chat(ChatOutput),
    Error { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeExecutionItem {
    pub json: ItemOutput,
    #[serde(rename = "pairedItem")]
    pub paired_item: PairedItem,
}

pub struct OpenRouterCachedNode<P: ChatCompletionProvider> {
    provider: P,
}

impl OpenRouterCachedNode<OpenRouterClient> {
    /// Node backed by the OpenRouter HTTP API
    pub fn from_credentials(credentials: &Credentials, config: &ClientConfig) -> LLMResult<Self> {
        Ok(Self::new(OpenRouterClient::new(credentials, config)?))
    }
}

impl<P: ChatCompletionProvider> OpenRouterCachedNode<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run every item in order.
    ///
    /// Items are sent one after another; the first failure aborts the batch
    /// unless `continue_on_fail` is set.
    pub async fn execute(
        &self,
        items: &[ChatParameters],
        options: ExecuteOptions,
    ) -> LLMResult<Vec<NodeExecutionItem>> {
        let mut outputs = Vec::with_capacity(items.len());

        for (index, params) in items.iter().enumerate() {
            let json = match self.execute_item(params).await {
                Ok(output) => ItemOutput::Chat(output),
                Err(e) if options.continue_on_fail => {
                    log::warn!("Item {} failed, continuing: {}", index, e);
                    ItemOutput::Error {
                        error: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };

            outputs.push(NodeExecutionItem {
                json,
                paired_item: PairedItem { item: index },
            });
        }

        Ok(outputs)
    }

    async fn execute_item(&self, params: &ChatParameters) -> LLMResult<ChatOutput> {
        match params.operation {
            params::Operation::Chat => self.chat(params).await,
        }
    }

    async fn chat(&self, params: &ChatParameters) -> LLMResult<ChatOutput> {
        let messages = build_messages(params);
        let request = build_request(params, messages);

        if request.is_streaming() {
            let stream = self.provider.chat_stream(&request).await?;
            let aggregator = StreamAggregator::collect(stream).await?;
            log::debug!(
                "[{}] aggregated {} stream chunks",
                self.provider.get_provider_name(),
                aggregator.chunk_count()
            );
            Ok(aggregator.into_output(&params.model))
        } else {
            let raw = self.provider.chat(&request).await?;
            normalize_completion(raw)
        }
    }

    /// Populate the model dropdown
    pub async fn get_models(&self) -> LLMResult<Vec<ModelOption>> {
        let load = async {
            let raw = self.provider.list_models().await?;
            model_options_from_response(&raw)
        };
        load.await.map_err(|e| e.into_model_load_error())
    }
}
