// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors that can occur when talking to OpenRouter or shaping a chat item
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    AuthError(String),

    #[error("API error: {status_code} - {message}")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Invalid response format from OpenRouter API")]
    InvalidResponse,

    #[error("No models found in OpenRouter API response")]
    NoModels,

    #[error("Failed to load models: {0}")]
    ModelLoadError(String),
}

impl LLMError {
    /// Wrap any model-listing failure the way the dropdown loader reports it.
    pub fn into_model_load_error(self) -> LLMError {
        match self {
            LLMError::ModelLoadError(_) => self,
            other => LLMError::ModelLoadError(other.to_string()),
        }
    }
}

pub type LLMResult<T> = Result<T, LLMError>;
