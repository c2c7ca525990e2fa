// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::Path;
use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_SITE_URL: &str = "https://github.com/ByteDance/openrouter-cached";
pub const DEFAULT_SITE_NAME: &str = "OpenRouter Cached";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const SITE_URL_ENV: &str = "OPENROUTER_SITE_URL";
pub const SITE_NAME_ENV: &str = "OPENROUTER_SITE_NAME";

/// Config errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to load file: {0}")]
    LoadFileError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid value for `{key}`: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

/// The static bearer token used for every request
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the key from `OPENROUTER_API_KEY`, empty when unset
    pub fn from_env() -> Self {
        Self::new(std::env::var(API_KEY_ENV).unwrap_or_default())
    }

    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.api_key.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("Credentials").field("api_key", &shown).finish()
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    /// Sent as `HTTP-Referer`
    pub site_url: Option<String>,
    /// Sent as `X-Title`
    pub site_name: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = Some(site_url.into());
        self
    }

    pub fn with_site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn site_url(&self) -> String {
        resolve_setting(
            self.site_url.as_deref(),
            std::env::var(SITE_URL_ENV).ok(),
            DEFAULT_SITE_URL,
        )
    }

    pub fn site_name(&self) -> String {
        resolve_setting(
            self.site_name.as_deref(),
            std::env::var(SITE_NAME_ENV).ok(),
            DEFAULT_SITE_NAME,
        )
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

/// Configured value, then environment, then built-in default
fn resolve_setting(configured: Option<&str>, env_value: Option<String>, default: &str) -> String {
    configured
        .map(str::to_string)
        .or(env_value.filter(|value| !value.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

/// Fallback chat parameters used by the CLI when flags are omitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDefaults {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub credentials: Credentials,
    pub client: ClientConfig,
    pub defaults: ChatDefaults,
}

fn get_str_value_or_none_from_yaml(item: &Yaml, key: &str) -> Result<Option<String>, ConfigError> {
    match &item[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(value) => Ok(Some(value.clone())),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

fn get_u64_value_or_none_from_yaml(item: &Yaml, key: &str) -> Result<Option<u64>, ConfigError> {
    match &item[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(value) if *value >= 0 => Ok(Some(*value as u64)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a non-negative integer",
        }),
    }
}

fn get_f64_value_or_none_from_yaml(item: &Yaml, key: &str) -> Result<Option<f64>, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        expected: "a number",
    };
    match &item[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(value) => Ok(Some(*value as f64)),
        Yaml::Real(raw) => raw.parse::<f64>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

impl Config {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::LoadFileError(path.display().to_string()))?;
        Self::from_yaml_str(&source)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let docs =
            YamlLoader::load_from_str(source).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let Some(doc) = docs.first() else {
            return Ok(Config::default());
        };

        let credentials_yaml = &doc["credentials"]["openrouter_cached_api"];
        let credentials = Credentials::new(
            get_str_value_or_none_from_yaml(credentials_yaml, "api_key")?.unwrap_or_default(),
        );

        let client_yaml = &doc["client"];
        let client = ClientConfig {
            base_url: get_str_value_or_none_from_yaml(client_yaml, "base_url")?,
            site_url: get_str_value_or_none_from_yaml(client_yaml, "site_url")?,
            site_name: get_str_value_or_none_from_yaml(client_yaml, "site_name")?,
            timeout_secs: get_u64_value_or_none_from_yaml(client_yaml, "timeout_secs")?,
        };

        let defaults_yaml = &doc["defaults"];
        let defaults = ChatDefaults {
            model: get_str_value_or_none_from_yaml(defaults_yaml, "model")?,
            system_prompt: get_str_value_or_none_from_yaml(defaults_yaml, "system_prompt")?,
            temperature: get_f64_value_or_none_from_yaml(defaults_yaml, "temperature")?,
        };

        Ok(Config {
            credentials,
            client,
            defaults,
        })
    }

    /// Credentials from the file, falling back to `OPENROUTER_API_KEY`
    pub fn resolve_credentials(&self) -> Credentials {
        if self.credentials.is_valid() {
            self.credentials.clone()
        } else {
            Credentials::from_env()
        }
    }
}
