use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Placeholder;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub placeholders: Vec<Placeholder>,
    /// e.g. "3/7"
    pub progress: String,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub session_id: Uuid,
    pub filename: String,
    pub placeholders: Vec<Placeholder>,
    pub filled_values: std::collections::BTreeMap<String, String>,
    pub conversation_history_length: usize,
    pub filled_count: usize,
    pub total_count: usize,
    pub unfilled_placeholders: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /status/:session_id
pub async fn handle_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let handle = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;
    let session = handle.lock().await;
    let (filled, total) = session.progress();

    Ok(Json(StatusResponse {
        session_id,
        placeholders: session.placeholders.clone(),
        progress: format!("{filled}/{total}"),
        completed: session.is_complete(),
    }))
}

/// GET /debug/:session_id
pub async fn handle_debug(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<DebugResponse>, AppError> {
    let handle = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;
    let session = handle.lock().await;
    let (filled_count, total_count) = session.progress();

    Ok(Json(DebugResponse {
        session_id,
        filename: session.original_filename.clone(),
        placeholders: session.placeholders.clone(),
        filled_values: session.filled_values.clone(),
        conversation_history_length: session.conversation.len(),
        filled_count,
        total_count,
        unfilled_placeholders: session.unfilled_names(),
        created_at: session.created_at,
    }))
}
