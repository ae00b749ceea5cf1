//! HTTP calls to the hosted providers.
//!
//! OpenAI and Groq share the chat-completions format. Anthropic uses the
//! Messages API with a separate `system` field and its own SSE event types.

use std::pin::Pin;

use agrisense_advisor::ImageAttachment;
use agrisense_core::{Error, Result};
use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::config::ResolvedProvider;
use crate::types::{ChatMessage, LLMProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token, the end marker, or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// What one SSE `data:` payload means for the stream.
#[derive(Debug, PartialEq)]
enum SseItem {
    Text(String),
    Stop,
    Fail(String),
    Skip,
}

fn endpoint(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::OpenAI => OPENAI_URL,
        LLMProvider::Groq => GROQ_URL,
        LLMProvider::Anthropic => ANTHROPIC_URL,
    }
}

fn authorized(client: &Client, target: &ResolvedProvider) -> RequestBuilder {
    let request = client
        .post(endpoint(target.provider))
        .header("Content-Type", "application/json");
    match target.provider {
        LLMProvider::Anthropic => request
            .header("x-api-key", &target.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION),
        _ => request.header("Authorization", format!("Bearer {}", target.api_key)),
    }
}

/// JSON body for a chat request.
///
/// The image, when present and supported, rides on the last user message.
fn request_body(
    target: &ResolvedProvider,
    messages: &[ChatMessage],
    image: Option<&ImageAttachment>,
    temperature: f64,
    max_tokens: usize,
    stream: bool,
) -> Value {
    let image = image.filter(|_| target.provider.supports_images());
    let last_user = messages.iter().rposition(|m| m.role == "user");

    let content = |i: usize, m: &ChatMessage| -> Value {
        match (image, Some(i) == last_user) {
            (Some(img), true) => image_content(target.provider, &m.content, img),
            _ => json!(m.content),
        }
    };

    let mut body = match target.provider {
        LLMProvider::Anthropic => {
            let system: Vec<&str> = messages
                .iter()
                .filter(|m| m.role == "system")
                .map(|m| m.content.as_str())
                .collect();
            let conversation: Vec<Value> = messages
                .iter()
                .enumerate()
                .filter(|(_, m)| m.role != "system")
                .map(|(i, m)| json!({"role": m.role, "content": content(i, m)}))
                .collect();
            let mut body = json!({ "model": target.model, "messages": conversation });
            if !system.is_empty() {
                body["system"] = json!(system.join("\n\n"));
            }
            body
        }
        LLMProvider::OpenAI | LLMProvider::Groq => {
            let msgs: Vec<Value> = messages
                .iter()
                .enumerate()
                .map(|(i, m)| json!({"role": m.role, "content": content(i, m)}))
                .collect();
            json!({ "model": target.model, "messages": msgs })
        }
    };

    body["temperature"] = json!(temperature);
    body["max_tokens"] = json!(max_tokens);
    if stream {
        body["stream"] = json!(true);
    }
    body
}

fn image_content(provider: LLMProvider, text: &str, image: &ImageAttachment) -> Value {
    match provider {
        LLMProvider::Anthropic => json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type,
                    "data": image.data,
                },
            },
            { "type": "text", "text": text },
        ]),
        _ => json!([
            { "type": "text", "text": text },
            {
                "type": "image_url",
                "image_url": { "url": format!("data:{};base64,{}", image.mime_type, image.data) },
            },
        ]),
    }
}

/// Text of a non-streaming response body.
fn response_text(provider: LLMProvider, body: &Value) -> Option<String> {
    match provider {
        LLMProvider::Anthropic => {
            let blocks = body["content"].as_array()?;
            let text: String = blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect();
            Some(text)
        }
        _ => body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string),
    }
}

/// One-shot completion. Any transport or API failure is `ServiceUnavailable`.
pub async fn complete(
    client: &Client,
    target: &ResolvedProvider,
    messages: &[ChatMessage],
    image: Option<&ImageAttachment>,
    temperature: f64,
    max_tokens: usize,
) -> Result<String> {
    let body = request_body(target, messages, image, temperature, max_tokens, false);
    debug!(provider = %target.provider, model = %target.model, "completion request");

    let response = authorized(client, target)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::ServiceUnavailable(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(Error::ServiceUnavailable(format!(
            "{} API error {}: {}",
            target.provider, status, detail
        )));
    }

    let parsed: Value = response
        .json()
        .await
        .map_err(|e| Error::ServiceUnavailable(format!("Unreadable response: {}", e)))?;

    response_text(target.provider, &parsed).ok_or_else(|| {
        Error::ServiceUnavailable(format!("{} response had no text", target.provider))
    })
}

/// Stream tokens for a conversation.
pub fn stream_chat(
    client: &Client,
    target: &ResolvedProvider,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: usize,
) -> BoxedStream {
    let body = request_body(target, &messages, None, temperature, max_tokens, true);
    let request = authorized(client, target).json(&body);
    let provider = target.provider;
    debug!(%provider, model = %target.model, "streaming request");

    Box::pin(async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut bytes_stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = bytes_stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };
            buffer.extend_from_slice(&bytes);

            for line in drain_lines(&mut buffer) {
                match decode_line(provider, &line) {
                    SseItem::Text(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseItem::Stop => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseItem::Fail(msg) => {
                        error!("{} stream error: {}", provider, msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    SseItem::Skip => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    })
}

/// Remove complete lines from `buffer`, leaving any partial tail.
///
/// Bytes are decoded only once their line is complete, so a multi-byte
/// character split across network chunks arrives intact.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buffer.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = buffer.drain(..=last_newline).collect();
    String::from_utf8_lossy(&complete)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(':'))
        .map(str::to_string)
        .collect()
}

fn decode_line(provider: LLMProvider, line: &str) -> SseItem {
    // Anthropic interleaves "event:" lines; the data line carries the type too.
    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
        return SseItem::Skip;
    };
    if data == "[DONE]" {
        return SseItem::Stop;
    }
    let Ok(event) = serde_json::from_str::<Value>(data) else {
        return SseItem::Skip;
    };

    let text = match provider {
        LLMProvider::Anthropic => match event["type"].as_str() {
            Some("content_block_delta") => event["delta"]["text"].as_str(),
            Some("message_stop") => return SseItem::Stop,
            Some("error") => {
                let msg = event["error"]["message"].as_str().unwrap_or("Unknown error");
                return SseItem::Fail(msg.to_string());
            }
            _ => None,
        },
        _ => event["choices"][0]["delta"]["content"].as_str(),
    };

    match text {
        Some(t) if !t.is_empty() => SseItem::Text(t.to_string()),
        _ => SseItem::Skip,
    }
}

/// Check a key with the cheapest authenticated call each provider offers.
pub async fn test_api_key(client: &Client, provider: LLMProvider, api_key: &str) -> Result<()> {
    let response = match provider {
        LLMProvider::OpenAI | LLMProvider::Groq => {
            let models_url = endpoint(provider).replace("chat/completions", "models");
            client
                .get(models_url)
                .header("Authorization", format!("Bearer {}", api_key))
                .send()
                .await
        }
        LLMProvider::Anthropic => {
            client
                .post(ANTHROPIC_URL)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&json!({
                    "model": crate::config::ANTHROPIC_MODELS[1],
                    "max_tokens": 1,
                    "messages": [{"role": "user", "content": "Hi"}],
                }))
                .send()
                .await
        }
    }
    .map_err(|e| Error::Http(e.to_string()))?;

    let status = response.status();
    // Anthropic answers 400 for quota or model problems once the key is accepted.
    let accepted = status.is_success()
        || (provider == LLMProvider::Anthropic && status.as_u16() == 400);
    if accepted {
        Ok(())
    } else {
        Err(Error::Http(format!("API returned status {}", status)))
    }
}
