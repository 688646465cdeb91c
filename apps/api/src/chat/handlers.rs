//! Axum route handler for the chat turn.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::placeholder::position_by_name;
use crate::models::{ConversationMessage, Placeholder, Session};
use crate::session::reconcile::{log_conflicts, merge_extracted};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    pub message: String,
    /// Client's copy of the list. Compared against the stored list, never applied.
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub assistant_message: String,
    /// Values committed during this turn only.
    pub filled_values: BTreeMap<String, String>,
    /// Authoritative list after this turn.
    pub placeholders: Vec<Placeholder>,
    pub next_question: Option<String>,
}

/// POST /chat
///
/// Runs one conversational turn under the session lock. History is only
/// extended when the resolver succeeds, so a failed turn leaves no trace.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    let handle = state
        .sessions
        .get(request.session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;
    let mut session = handle.lock().await;

    log_conflicts(&session, &request.placeholders);

    let resolution = state
        .resolver
        .resolve(message, &session.placeholders, &session.conversation)
        .await?;

    let committed = merge_extracted(&mut session, &resolution.filled_values);
    let next_question = next_question(&session, resolution.next_question.as_deref());

    session.conversation.push(ConversationMessage::user(message));
    session
        .conversation
        .push(ConversationMessage::assistant(resolution.assistant_message.clone()));

    let (filled, total) = session.progress();
    info!(
        "Session {}: {} value(s) committed via {} resolver, progress {filled}/{total}",
        session.id,
        committed.len(),
        state.resolver.backend()
    );

    Ok(Json(ChatResponse {
        assistant_message: resolution.assistant_message,
        filled_values: committed,
        placeholders: session.placeholders.clone(),
        next_question,
    }))
}

/// Keeps the resolver's suggestion when it names a still-open placeholder,
/// otherwise falls back to the first open one.
fn next_question(session: &Session, proposed: Option<&str>) -> Option<String> {
    let open: Vec<&Placeholder> = session.placeholders.iter().filter(|p| !p.is_filled()).collect();
    proposed
        .and_then(|q| position_by_name(session.placeholders.iter().map(|p| p.name.as_str()), q))
        .map(|index| &session.placeholders[index])
        .filter(|p| !p.is_filled())
        .or_else(|| open.first().copied())
        .map(|p| p.name.clone())
}
