use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status and which resolver backend is answering chat turns.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let model = if state.config.llm_enabled() {
        state.config.llm_model.clone()
    } else {
        state.resolver.backend().to_string()
    };

    Json(json!({
        "status": "ok",
        "model": model,
        "service": "docassist-api"
    }))
}
