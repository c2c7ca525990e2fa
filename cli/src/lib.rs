// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use openrouter_cached_core::{
    config::{ChatDefaults, Config},
    llm::{ModelOption, ReasoningEffort, ResponseFormatType},
    node::{
        AdditionalFields, CachingOptions, ChatParameters, JsonInput, ReasoningOptions,
        ResponseFormatParameter, RoutingOptions,
    },
};
use serde_json::Value;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "openrouter-cached";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// `~/.config/openrouter-cached/config.yaml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the configuration file.
///
/// An explicit path must exist. The default path is optional; when it is
/// missing every setting falls back to the environment and built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };

    log::debug!("Loading configuration from {}", path.display());
    Config::from_yaml(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// `@path` reads the file at `path`; anything else is taken literally
pub fn read_text_arg(raw: &str) -> Result<String> {
    match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path)),
        None => Ok(raw.to_string()),
    }
}

fn parse_effort(raw: &str) -> Result<ReasoningEffort, String> {
    serde_json::from_value(Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown reasoning effort `{}` (expected high, medium or low)", raw))
}

#[derive(Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// User message to send
    pub message: String,

    /// Model ID, e.g. anthropic/claude-3.5-sonnet
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub system_prompt: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Conversation history as a JSON array of messages (or @file)
    #[arg(long)]
    pub history: Option<String>,

    /// Image URL for the user message (repeatable)
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// Mark the system prompt as a cache breakpoint
    #[arg(long)]
    pub cache_system_prompt: bool,

    /// Large content appended to the system prompt as a cached part (or @file)
    #[arg(long, requires = "cache_system_prompt")]
    pub cache_content: Option<String>,

    /// Enable reasoning with this effort (high, medium, low)
    #[arg(long, value_parser = parse_effort)]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Enable reasoning with an explicit token budget; overrides the effort
    #[arg(long)]
    pub reasoning_max_tokens: Option<u32>,

    /// Use reasoning but leave it out of the response
    #[arg(long)]
    pub exclude_reasoning: bool,

    #[arg(long)]
    pub stream: bool,

    /// Routing strategy, e.g. fallback
    #[arg(long)]
    pub route: Option<String>,

    /// Provider preferences as a JSON object (or @file)
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub require_parameters: bool,

    #[arg(long)]
    pub zero_data_retention: bool,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Comma-separated stop sequences
    #[arg(long)]
    pub stop: Option<String>,

    #[arg(long)]
    pub seed: Option<i64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub frequency_penalty: Option<f64>,

    #[arg(long)]
    pub presence_penalty: Option<f64>,

    /// Ask for a JSON object response
    #[arg(long)]
    pub json_mode: bool,
}

impl ChatArgs {
    /// Merge the flags with the configured defaults into one chat item
    pub fn into_parameters(self, defaults: &ChatDefaults) -> Result<ChatParameters> {
        let model = self
            .model
            .or_else(|| defaults.model.clone())
            .ok_or_else(|| anyhow!("No model given; pass --model or set defaults.model"))?;

        let mut params = ChatParameters::new(model, self.message);

        if let Some(system_prompt) = self.system_prompt.or_else(|| defaults.system_prompt.clone()) {
            params = params.with_system_prompt(system_prompt);
        }
        if let Some(temperature) = self.temperature.or(defaults.temperature) {
            params = params.with_temperature(temperature);
        }
        if let Some(history) = &self.history {
            params = params.with_history(JsonInput::Encoded(read_text_arg(history)?));
        }
        if !self.images.is_empty() {
            params = params.with_images(Value::from(self.images));
        }

        if self.cache_system_prompt {
            let cache_content = self
                .cache_content
                .as_deref()
                .map(read_text_arg)
                .transpose()?
                .map(JsonInput::Encoded);
            params = params.with_caching(CachingOptions {
                cache_system_prompt: true,
                cache_content,
            });
        }

        if self.reasoning_effort.is_some() || self.reasoning_max_tokens.is_some() || self.exclude_reasoning {
            params = params.with_reasoning(ReasoningOptions {
                enabled: true,
                effort: Some(self.reasoning_effort.unwrap_or_default()),
                max_tokens: self.reasoning_max_tokens.unwrap_or(0),
                exclude: self.exclude_reasoning,
            });
        }

        if self.route.is_some()
            || self.provider.is_some()
            || self.require_parameters
            || self.zero_data_retention
        {
            let provider = match &self.provider {
                Some(raw) => JsonInput::Encoded(read_text_arg(raw)?),
                None => JsonInput::empty_object(),
            };
            params = params.with_routing(RoutingOptions {
                route: self.route.unwrap_or_default(),
                require_parameters: self.require_parameters,
                zero_data_retention: self.zero_data_retention,
                provider: Some(provider),
            });
        }

        params = params.with_additional_fields(AdditionalFields {
            frequency_penalty: self.frequency_penalty,
            logit_bias: None,
            max_tokens: self.max_tokens,
            n: None,
            presence_penalty: self.presence_penalty,
            response_format: self
                .json_mode
                .then(|| ResponseFormatParameter::new(ResponseFormatType::JsonObject)),
            seed: self.seed,
            stop: self.stop,
            top_p: self.top_p,
        });

        Ok(params.with_stream(self.stream))
    }
}

/// Parse a batch of items: a JSON array, or a single object for one item
pub fn parse_items(source: &str) -> Result<Vec<ChatParameters>> {
    let value: Value = serde_json::from_str(source).context("Items are not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => bail!("Items must be a JSON array or object"),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).with_context(|| format!("Invalid item {}", index))
        })
        .collect()
}

pub fn render_model_options(options: &[ModelOption]) -> String {
    use owo_colors::OwoColorize;

    let mut result = String::new();
    for option in options {
        result.push_str(&format!(
            "{}  {}\n",
            option.value.bright_cyan(),
            option.name.bold()
        ));
        if !option.description.is_empty() {
            result.push_str(&format!("    {}\n", option.description.dimmed()));
        }
    }
    result
}
