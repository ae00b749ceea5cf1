//! Farmer chat and provider configuration: /api/chat/*.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use agrisense_advisor::{ChatReply, ChatRequest, ResultSource, TaskCategory, CHAT_FALLBACK_MESSAGE};
use agrisense_llm::providers::{self, StreamChunk};
use agrisense_llm::*;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/status", get(get_status))
        .route("/chat", post(chat))
        .route("/chat/stream", post(stream_chat))
        .route("/chat/config", get(get_config).put(update_config))
        .route("/chat/config/test", post(test_key))
}

/// GET /api/chat/status
async fn get_status(State(state): State<Arc<AppState>>) -> Json<ChatStatus> {
    let handle = state.advisor.settings().models.select(TaskCategory::Chat);
    let config = state.llm_config.read();
    let resolved = config.resolve_for_handle(handle);
    let model_enabled = state.advisor.settings().model_enabled;

    Json(ChatStatus {
        llm_available: model_enabled && resolved.is_some(),
        llm_provider: resolved.as_ref().map(|r| r.provider.to_string()),
        default_model: resolved.map(|r| r.model),
        available_models: config.available_models(),
        model_enabled,
    })
}

/// POST /api/chat: whole reply at once, through the pipeline.
async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Json<ChatReply> {
    Json(state.advisor.chat(&req).await)
}

fn sse(event: &StreamEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(serde_json::to_string(event).unwrap_or_default()))
}

/// POST /api/chat/stream: token stream over SSE.
///
/// With no usable provider, or when the provider fails before the first
/// token, the fixed fallback message is streamed instead.
async fn stream_chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Sse<SseStream> {
    let start = Instant::now();
    let settings = state.advisor.settings();

    let resolved = if settings.model_enabled {
        let handle = settings.models.select(TaskCategory::Chat);
        state.llm_config.read().resolve_for_handle(handle)
    } else {
        None
    };

    let Some(target) = resolved else {
        let fallback: SseStream = Box::pin(futures::stream::iter(fallback_events(start)));
        return Sse::new(fallback);
    };

    let messages = chat_messages(&req.history, &req.message, req.language.as_deref());
    let llm_stream = providers::stream_chat(
        &state.http,
        &target,
        messages,
        DEFAULT_TEMPERATURE,
        settings.max_tokens,
    );
    let model = target.model;

    let sse_stream: SseStream = Box::pin(async_stream::stream! {
        let mut llm_stream = llm_stream;
        let mut emitted = 0usize;

        while let Some(chunk) = llm_stream.next().await {
            match chunk {
                StreamChunk::Token(content) => {
                    emitted += 1;
                    yield sse(&StreamEvent::Token { content });
                }
                StreamChunk::Done { tokens_used } => {
                    yield sse(&StreamEvent::Done {
                        model: Some(model.clone()),
                        source: ResultSource::Model.to_string(),
                        tokens_used,
                        duration: start.elapsed().as_millis() as u64,
                    });
                    yield Ok(Event::default().data("[DONE]"));
                    return;
                }
                StreamChunk::Error(error) if emitted == 0 => {
                    warn!("Chat stream failed before first token: {}", error);
                    for event in fallback_events(start) {
                        yield event;
                    }
                    return;
                }
                StreamChunk::Error(error) => {
                    yield sse(&StreamEvent::Error { error });
                    return;
                }
            }
        }
    });

    Sse::new(sse_stream)
}

fn fallback_events(start: Instant) -> Vec<Result<Event, Infallible>> {
    vec![
        sse(&StreamEvent::Token {
            content: CHAT_FALLBACK_MESSAGE.to_string(),
        }),
        sse(&StreamEvent::Done {
            model: None,
            source: ResultSource::FallbackEngine.to_string(),
            tokens_used: 0,
            duration: start.elapsed().as_millis() as u64,
        }),
        Ok(Event::default().data("[DONE]")),
    ]
}

/// GET /api/chat/config
async fn get_config(State(state): State<Arc<AppState>>) -> Json<LLMConfigResponse> {
    Json(state.llm_config.read().to_response())
}

/// PUT /api/chat/config
async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> impl IntoResponse {
    // Edit a copy; the shared config only changes once the file is written.
    let mut shared = state.llm_config.write();
    let mut config = shared.clone();

    if let Err(e) = config.apply_update(&update) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        );
    }
    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    let response = serde_json::to_value(config.to_response()).unwrap_or_default();
    *shared = config;
    (StatusCode::OK, Json(response))
}

/// POST /api/chat/config/test
async fn test_key(State(state): State<Arc<AppState>>, Json(req): Json<TestKeyRequest>) -> Json<serde_json::Value> {
    let outcome = match req.provider.parse::<LLMProvider>() {
        Ok(provider) => providers::test_api_key(&state.http, provider, &req.api_key)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };

    Json(match outcome {
        Ok(()) => serde_json::json!({ "success": true }),
        Err(error) => serde_json::json!({ "success": false, "error": error }),
    })
}
