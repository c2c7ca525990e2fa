// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Model catalogue handling for the `GET /models` endpoint.
//!
//! The catalogue is turned into dropdown options: display name, model id as
//! the value, and a short description that carries per-million-token pricing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::error::{LLMError, LLMResult};

const ELLIPSIS: &str = "...";

/// A single entry from the OpenRouter catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pricing: Option<ModelPricing>,
}

/// Per-token prices; OpenRouter encodes them as decimal strings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelPricing {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub completion: Option<Value>,
}

/// One selectable model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelOption {
    pub name: String,
    pub value: String,
    pub description: String,
}

/// Per-token price to per-million-token price; unparsable prices become NaN
fn price_per_million(price: Option<&Value>) -> f64 {
    let per_token = match price {
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(f64::NAN),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    };
    per_token * 1_000_000.0
}

fn pricing_line(pricing: Option<&ModelPricing>) -> String {
    let prompt = price_per_million(pricing.and_then(|p| p.prompt.as_ref()));
    let completion = price_per_million(pricing.and_then(|p| p.completion.as_ref()));
    format!(
        "Price: ${}/1M tokens (prompt), ${}/1M tokens (completion)",
        prompt, completion
    )
}

/// Half of the description followed by the pricing line, cut with `...` when
/// it outgrows the original description.
///
/// The cut keeps `original_len - 3` chars. For descriptions shorter than the
/// ellipsis that count is negative and is taken from the end instead, so an
/// empty description loses the last three chars of the pricing line.
pub fn describe_model(description: &str, pricing: Option<&ModelPricing>) -> String {
    let original_len = description.chars().count();
    let truncated: String = description.chars().take(original_len / 2).collect();
    let combined = format!("{} {}", truncated, pricing_line(pricing))
        .trim()
        .to_string();
    let combined_len = combined.chars().count();

    if combined_len <= original_len {
        return combined;
    }

    let keep = match original_len.checked_sub(ELLIPSIS.len()) {
        Some(keep) => keep,
        None => combined_len.saturating_sub(ELLIPSIS.len() - original_len),
    };
    let mut cut: String = combined.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

impl OpenRouterModel {
    /// Entries without both an id and a name are not selectable
    pub fn into_option(self) -> Option<ModelOption> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let name = self.name.filter(|name| !name.is_empty())?;
        let description = describe_model(
            self.description.as_deref().unwrap_or_default(),
            self.pricing.as_ref(),
        );
        Some(ModelOption {
            name,
            value: id,
            description,
        })
    }
}

/// Turn a raw `/models` body into sorted dropdown options
pub fn model_options_from_response(raw: &Value) -> LLMResult<Vec<ModelOption>> {
    let entries = raw
        .get("data")
        .and_then(Value::as_array)
        .ok_or(LLMError::InvalidResponse)?;

    let mut options: Vec<ModelOption> = entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<OpenRouterModel>(entry.clone()).ok())
        .filter_map(OpenRouterModel::into_option)
        .collect();

    options.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    if options.is_empty() {
        return Err(LLMError::NoModels);
    }

    log::debug!("Loaded {} model options", options.len());
    Ok(options)
}
