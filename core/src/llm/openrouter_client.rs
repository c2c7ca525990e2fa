// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{ClientConfig, Credentials};
use crate::llm::error::{LLMError, LLMResult};
use crate::llm::llm_provider::ChatCompletionProvider;
use crate::llm::{ChatRequest, LLMStream, sse};

/// HTTP client for the OpenRouter REST API
pub struct OpenRouterClient {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl OpenRouterClient {
    pub fn new(credentials: &Credentials, config: &ClientConfig) -> LLMResult<Self> {
        if !credentials.is_valid() {
            return Err(LLMError::AuthError("No valid API key provided".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(config.base_url())?,
            headers: build_headers(credentials, config)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> LLMResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LLMError::ConfigError(format!("Invalid endpoint `{}`: {}", path, e)))
    }

    async fn post_completion(&self, request: &ChatRequest) -> LLMResult<reqwest::Response> {
        let url = self.endpoint("chat/completions")?;
        log::debug!(
            "[{}] POST {} model={} messages={} stream={}",
            self.get_provider_name(),
            url,
            request.model,
            request.messages.len(),
            request.is_streaming()
        );

        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await?;

        check_status(response).await
    }
}

/// Make sure relative joins land under the base path
fn normalize_base_url(raw: &str) -> LLMResult<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| LLMError::ConfigError(format!("Invalid base URL `{}`: {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn build_headers(credentials: &Credentials, config: &ClientConfig) -> LLMResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|e| LLMError::AuthError(format!("Invalid API key: {}", e)))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in [
        (HeaderName::from_static("http-referer"), config.site_url()),
        (HeaderName::from_static("x-title"), config.site_name()),
    ] {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| LLMError::ConfigError(format!("Invalid header value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

async fn check_status(response: reqwest::Response) -> LLMResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    log::warn!("OpenRouter returned {}: {}", status, error_text);
    Err(LLMError::ApiError {
        status_code: status.as_u16(),
        message: extract_error_message(&error_text),
    })
}

/// OpenRouter wraps failures as `{"error": {"message": ...}}`; fall back to the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ChatCompletionProvider for OpenRouterClient {
    async fn chat(&self, request: &ChatRequest) -> LLMResult<Value> {
        let response = self.post_completion(request).await?;
        let response_text = response.text().await?;
        serde_json::from_str::<Value>(&response_text).map_err(LLMError::JsonError)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> LLMResult<LLMStream> {
        let response = self.post_completion(request).await?;

        // The body is buffered whole and split afterwards
        let response_text = response.text().await?;
        let chunks = sse::parse_event_stream(&response_text);
        log::debug!(
            "[{}] received {} stream chunks",
            self.get_provider_name(),
            chunks.len()
        );
        Ok(sse::into_stream(chunks))
    }

    async fn list_models(&self) -> LLMResult<Value> {
        let url = self.endpoint("models")?;
        log::debug!("[{}] GET {}", self.get_provider_name(), url);

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;
        let response = check_status(response).await?;
        let response_text = response.text().await?;
        serde_json::from_str::<Value>(&response_text).map_err(LLMError::JsonError)
    }

    fn get_provider_name(&self) -> &str {
        "openrouter"
    }
}
