//! Liveness and capability probe.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /api/health
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let provider = state
        .llm_config
        .read()
        .resolve_provider()
        .map(|r| r.provider.to_string());

    Json(serde_json::json!({
        "status": "ok",
        "service": "agrisense",
        "version": env!("CARGO_PKG_VERSION"),
        "modelEnabled": state.advisor.settings().model_enabled,
        "llmProvider": provider,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
