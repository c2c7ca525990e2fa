// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Message-array construction.
//!
//! Three passes run in order: pick the base conversation (history or
//! system prompt + message), merge images into the last user turn, then add
//! cache breakpoints to the first system turn.

use serde_json::Value;

use crate::llm::{CacheControl, ChatMessage, ContentPart, ImageDetail, MessageRole};
use crate::node::params::{CachingOptions, ChatParameters, JsonInput};

/// Run the full pipeline for one item
pub fn build_messages(params: &ChatParameters) -> Vec<ChatMessage> {
    let mut messages = build_base_messages(
        &params.conversation_history,
        &params.system_prompt,
        &params.message,
    );

    attach_images(&mut messages, &params.images);

    if let Some(caching) = &params.prompt_caching.caching {
        apply_prompt_caching(&mut messages, caching);
    }

    messages
}

/// A non-empty history wins; otherwise `[system?, user]`.
pub fn build_base_messages(
    history: &JsonInput,
    system_prompt: &str,
    message: &str,
) -> Vec<ChatMessage> {
    if let Some(history) = parse_history(history) {
        log::debug!("Using {} messages from conversation history", history.len());
        return history;
    }

    let mut messages = Vec::with_capacity(2);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::system(system_prompt));
    }
    messages.push(ChatMessage::user(message));
    messages
}

fn parse_history(history: &JsonInput) -> Option<Vec<ChatMessage>> {
    let value = match history.parse() {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring conversation history that is not valid JSON: {}", e);
            return None;
        }
    };

    let entries = match value {
        Value::Array(entries) if !entries.is_empty() => entries,
        _ => return None,
    };

    match serde_json::from_value::<Vec<ChatMessage>>(Value::Array(entries)) {
        Ok(messages) => Some(messages),
        Err(e) => {
            log::warn!("Ignoring conversation history with malformed messages: {}", e);
            None
        }
    }
}

/// Append images to the last user message as `image_url` parts.
///
/// The message's existing text becomes the leading part. Without a user
/// message, or when `images` is not a non-empty JSON array, nothing changes.
pub fn attach_images(messages: &mut [ChatMessage], images: &JsonInput) {
    let entries = match images.parse() {
        Ok(Value::Array(entries)) if !entries.is_empty() => entries,
        Ok(_) => return,
        Err(e) => {
            log::warn!("Ignoring images that are not valid JSON: {}", e);
            return;
        }
    };

    let Some(target) = messages
        .iter_mut()
        .rev()
        .find(|message| message.role == MessageRole::User)
    else {
        log::debug!("No user message to attach {} images to", entries.len());
        return;
    };

    let mut parts = target.take_parts();
    parts.extend(entries.iter().filter_map(image_part));
    target.set_parts(parts);
}

/// A bare URL string, or an object with `url` (also accepted as `URL`) and
/// an optional `detail` that defaults to `auto`
fn image_part(entry: &Value) -> Option<ContentPart> {
    match entry {
        Value::String(url) => Some(ContentPart::image(url.as_str(), None)),
        Value::Object(fields) => {
            let url = fields
                .get("url")
                .or_else(|| fields.get("URL"))
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())?;
            let detail = match fields.get("detail").and_then(Value::as_str) {
                Some(raw) if !raw.is_empty() => ImageDetail::parse(raw).unwrap_or_else(|| {
                    log::warn!("Unknown image detail `{}`, using auto", raw);
                    ImageDetail::Auto
                }),
                _ => ImageDetail::Auto,
            };
            Some(ContentPart::image(url, Some(detail)))
        }
        _ => {
            log::debug!("Skipping image entry: {}", entry);
            None
        }
    }
}

/// Put a cache breakpoint on the first system message.
///
/// With `cache_content`, that content is appended as a cached text part;
/// otherwise the last existing part is marked.
pub fn apply_prompt_caching(messages: &mut [ChatMessage], caching: &CachingOptions) {
    if !caching.cache_system_prompt {
        return;
    }

    let Some(system) = messages
        .iter_mut()
        .find(|message| message.role == MessageRole::System)
    else {
        log::debug!("Prompt caching requested but there is no system message");
        return;
    };

    let mut parts = system.take_parts();
    let cache_content = caching
        .cache_content
        .as_ref()
        .map(JsonInput::as_text)
        .unwrap_or_default();

    if !cache_content.is_empty() {
        parts.push(ContentPart::cached_text(cache_content));
    } else if let Some(last) = parts.last_mut() {
        last.set_cache_control(CacheControl::ephemeral());
    }

    system.set_parts(parts);
}
