// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::llm::{ChatMessage, ChatRequest, ReasoningRequest, ResponseFormat};
use crate::node::params::{AdditionalFields, ChatParameters, ReasoningOptions, RoutingOptions};

/// Assemble the request body for one item from its parameters and the
/// already-built message array
pub fn build_request(params: &ChatParameters, messages: Vec<ChatMessage>) -> ChatRequest {
    let mut request = ChatRequest::new(params.model.clone(), messages, params.temperature);

    apply_additional_fields(&mut request, &params.additional_fields);

    if let Some(config) = &params.reasoning.config {
        request.reasoning = reasoning_request(config);
    }

    if params.stream {
        request.stream = Some(true);
    }

    if let Some(routing) = &params.provider_routing.routing {
        apply_routing(&mut request, routing);
    }

    request
}

fn apply_additional_fields(request: &mut ChatRequest, fields: &AdditionalFields) {
    request.frequency_penalty = fields.frequency_penalty;
    request.max_tokens = fields.max_tokens;
    request.n = fields.n;
    request.presence_penalty = fields.presence_penalty;
    request.seed = fields.seed;
    request.top_p = fields.top_p;

    request.stop = fields.stop.as_deref().and_then(split_stop_sequences);

    request.response_format = fields
        .response_format
        .as_ref()
        .and_then(|format| format.format_type())
        .map(|format_type| ResponseFormat { format_type });

    request.logit_bias = fields
        .logit_bias
        .as_ref()
        .and_then(|bias| match bias.parse() {
            Ok(Value::Object(map)) => Some(map),
            Ok(other) => {
                log::warn!("Ignoring logit_bias that is not a JSON object: {}", other);
                None
            }
            Err(e) => {
                log::warn!("Ignoring logit_bias that is not valid JSON: {}", e);
                None
            }
        });
}

/// `"END, STOP"` becomes `["END", "STOP"]`; blank pieces are dropped
fn split_stop_sequences(raw: &str) -> Option<Vec<String>> {
    let sequences: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|sequence| !sequence.is_empty())
        .map(str::to_string)
        .collect();
    (!sequences.is_empty()).then_some(sequences)
}

fn reasoning_request(config: &ReasoningOptions) -> Option<ReasoningRequest> {
    if !config.enabled {
        return None;
    }

    let mut reasoning = ReasoningRequest::default();
    if config.max_tokens > 0 {
        reasoning.max_tokens = Some(config.max_tokens);
    } else {
        reasoning.effort = config.effort;
    }
    if config.exclude {
        reasoning.exclude = Some(true);
    }
    Some(reasoning)
}

fn apply_routing(request: &mut ChatRequest, routing: &RoutingOptions) {
    if !routing.route.is_empty() {
        request.route = Some(routing.route.clone());
    }
    if routing.require_parameters {
        request.require_parameters = Some(true);
    }
    if routing.zero_data_retention {
        request.zero_data_retention = Some(true);
    }

    request.provider = routing
        .provider
        .as_ref()
        .filter(|provider| !provider.as_text().is_empty())
        .and_then(|provider| match provider.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring provider preferences that are not valid JSON: {}", e);
                None
            }
        });
}
