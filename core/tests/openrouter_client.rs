// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! OpenRouter client and node tests against a wiremock server.

use openrouter_cached_core::config::{ClientConfig, Credentials};
use openrouter_cached_core::llm::{
    ChatCompletionProvider, ChatMessage, ChatRequest, LLMError, OpenRouterClient, StreamAggregator,
};
use openrouter_cached_core::node::{
    CachingOptions, ChatParameters, ExecuteOptions, ItemOutput, OpenRouterCachedNode,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for_server(server: &MockServer) -> ClientConfig {
    ClientConfig::default()
        .with_base_url(format!("{}/api/v1", server.uri()))
        .with_site_url("https://example.com/app")
        .with_site_name("Example App")
        .with_timeout_secs(5)
}

fn client_for_server(server: &MockServer) -> OpenRouterClient {
    OpenRouterClient::new(&Credentials::new("sk-or-test"), &config_for_server(server))
        .expect("client creation should succeed")
}

fn completion_body() -> serde_json::Value {
    json!({
        "id": "gen-123",
        "model": "openai/gpt-4o-mini",
        "choices": [{
            "message": {"role": "assistant", "content": "  Hello back!\n"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
    })
}

const STREAM_BODY: &str = concat!(
    ": OPENROUTER PROCESSING\n\n",
    "data: {\"model\":\"deepseek/deepseek-r1\",\"choices\":[{\"delta\":{\"reasoning\":\"Thinking\"}}]}\r\n\r\n",
    "data: {\"model\":\"deepseek/deepseek-r1\",\"choices\":[{\"delta\":{\"content\":\"Hi \"}}]}\n\n",
    "data: {\"model\":\"deepseek/deepseek-r1\",\"choices\":[{\"delta\":{\"content\":\"there\"},\"finish_reason\":\"stop\"}]}\n\n",
    "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2,\"total_tokens\":6}}\n\n",
    "data: [DONE]\n\n"
);

#[tokio::test]
async fn chat_sends_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-or-test"))
        .and(header("content-type", "application/json"))
        .and(header("http-referer", "https://example.com/app"))
        .and(header("x-title", "Example App"))
        .and(body_json(json!({
            "model": "openai/gpt-4o-mini",
            "messages": [{"role": "user", "content": "Hello"}],
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let request = ChatRequest::new("openai/gpt-4o-mini", vec![ChatMessage::user("Hello")], 0.5);
    let raw = client.chat(&request).await.expect("chat should succeed");

    assert_eq!(raw["id"], "gen-123");
}

#[tokio::test]
async fn chat_surfaces_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "No auth credentials found", "code": 401}
        })))
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let request = ChatRequest::new("m", vec![ChatMessage::user("x")], 0.9);
    let err = client.chat(&request).await.expect_err("401 should fail");

    match err {
        LLMError::ApiError {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 401);
            assert_eq!(message, "No auth credentials found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn chat_stream_yields_parsed_chunks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(STREAM_BODY, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let request =
        ChatRequest::new("deepseek/deepseek-r1", vec![ChatMessage::user("Hi")], 0.9).with_stream(true);
    let stream = client.chat_stream(&request).await.expect("stream should open");
    let aggregator = StreamAggregator::collect(stream).await.expect("stream should drain");

    assert_eq!(aggregator.chunk_count(), 4);
    let output = aggregator.into_output("deepseek/deepseek-r1");
    assert_eq!(output.response, "Hi there");
    assert_eq!(output.reasoning.as_deref(), Some("Thinking"));
    assert_eq!(output.finish_reason.as_deref(), Some("stop"));
    assert_eq!(output.usage, Some(json!({"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6})));
    assert_eq!(output.streamed, Some(true));
}

#[tokio::test]
async fn list_models_fetches_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .and(header("authorization", "Bearer sk-or-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "openai/gpt-4o",
                    "name": "OpenAI: GPT-4o",
                    "description": "GPT-4o is OpenAI's flagship model.",
                    "pricing": {"prompt": "0.0000025", "completion": "0.00001"}
                },
                {
                    "id": "anthropic/claude-3.5-sonnet",
                    "name": "Anthropic: Claude 3.5 Sonnet",
                    "description": "",
                    "pricing": {"prompt": "0.000003", "completion": "0.000015"}
                }
            ]
        })))
        .mount(&server)
        .await;

    let node = OpenRouterCachedNode::new(client_for_server(&server));
    let options = node.get_models().await.expect("models should load");

    assert_eq!(options.len(), 2);
    assert_eq!(options[0].value, "anthropic/claude-3.5-sonnet");
    assert_eq!(
        options[0].description,
        "Price: $3/1M tokens (prompt), $15/1M tokens (completi..."
    );
    assert_eq!(options[1].name, "OpenAI: GPT-4o");
}

#[tokio::test]
async fn list_models_failure_is_wrapped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let node = OpenRouterCachedNode::new(client_for_server(&server));
    let err = node.get_models().await.expect_err("500 should fail");

    assert_eq!(
        err.to_string(),
        "Failed to load models: API error: 500 - upstream down"
    );
}

#[tokio::test]
async fn node_executes_cached_chat_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_json(json!({
            "model": "anthropic/claude-3.5-sonnet",
            "messages": [
                {
                    "role": "system",
                    "content": [
                        {"type": "text", "text": "You are a librarian."},
                        {"type": "text", "text": "BOOK TEXT", "cache_control": {"type": "ephemeral"}}
                    ]
                },
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Summarize chapter one"},
                        {"type": "image_url", "image_url": {"url": "https://example.com/cover.png"}}
                    ]
                }
            ],
            "temperature": 0.9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let node = OpenRouterCachedNode::from_credentials(
        &Credentials::new("sk-or-test"),
        &config_for_server(&server),
    )
    .expect("node creation should succeed");

    let items = vec![
        ChatParameters::new("anthropic/claude-3.5-sonnet", "Summarize chapter one")
            .with_system_prompt("You are a librarian.")
            .with_images(r#"["https://example.com/cover.png"]"#)
            .with_caching(CachingOptions {
                cache_system_prompt: true,
                cache_content: Some("BOOK TEXT".into()),
            }),
    ];

    let outputs = node
        .execute(&items, ExecuteOptions::default())
        .await
        .expect("execution should succeed");

    assert_eq!(outputs.len(), 1);
    let ItemOutput::Chat(output) = &outputs[0].json else {
        panic!("expected a chat output");
    };
    assert_eq!(output.response, "Hello back!");
    assert_eq!(output.model.as_deref(), Some("openai/gpt-4o-mini"));
    assert_eq!(outputs[0].paired_item.item, 0);
}

#[tokio::test]
async fn node_continue_on_fail_keeps_going() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "broken/model"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "broken/model is not a valid model ID"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .mount(&server)
        .await;

    let node = OpenRouterCachedNode::new(client_for_server(&server));
    let items = vec![
        ChatParameters::new("broken/model", "one"),
        ChatParameters::new("openai/gpt-4o-mini", "two"),
    ];

    let outputs = node
        .execute(&items, ExecuteOptions { continue_on_fail: true })
        .await
        .expect("continue_on_fail should not abort");

    assert_eq!(
        serde_json::to_value(&outputs[0]).unwrap(),
        json!({
            "json": {"error": "API error: 400 - broken/model is not a valid model ID"},
            "pairedItem": {"item": 0}
        })
    );
    assert!(matches!(outputs[1].json, ItemOutput::Chat(_)));
    assert_eq!(outputs[1].paired_item.item, 1);
}
