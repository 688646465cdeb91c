//! Axum route handlers for upload and download.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::document::{is_docx_filename, render_document, DOCX_MIME};
use crate::errors::AppError;
use crate::extraction::{enrich, extract_placeholders};
use crate::models::{Placeholder, Session};
use crate::session::reconcile::log_conflicts;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub filename: String,
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub session_id: Uuid,
    /// Advisory only; rendering always uses the stored list.
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

/// POST /upload
///
/// Accepts a multipart form with a single `file` field holding a .docx package.
/// Detects placeholders, enriches them, and opens a new session.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let max_bytes = state.config.max_file_size_bytes();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(base_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("Uploaded file has no name".to_string()))?;
        if !is_docx_filename(&filename) {
            return Err(AppError::Validation(
                "Only .docx files are supported".to_string(),
            ));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} MB limit",
                state.config.max_file_size_mb
            )));
        }

        return open_session(&state, filename, data).await.map(Json);
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

async fn open_session(
    state: &AppState,
    filename: String,
    data: Bytes,
) -> Result<UploadResponse, AppError> {
    let extraction = extract_placeholders(&data)?;
    let mut placeholders = extraction.placeholders;
    enrich(state.describer.as_ref(), &extraction.text, &mut placeholders).await;

    let session = Session::new(filename.clone(), data, placeholders.clone());
    let session_id = session.id;
    state.sessions.put(session).await;

    info!(
        "Session {session_id} opened for '{filename}' with {} placeholder(s) ({} describer)",
        placeholders.len(),
        state.describer.backend()
    );

    Ok(UploadResponse {
        session_id,
        filename,
        placeholders,
    })
}

/// POST /download
///
/// Renders the stored document with the stored values. Rejects with 400 while
/// any placeholder is still open.
pub async fn handle_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .sessions
        .get(request.session_id)
        .await
        .ok_or_else(AppError::session_not_found)?;
    let session = handle.lock().await;

    log_conflicts(&session, &request.placeholders);

    let rendered = render_document(&session.document, &session.placeholders)?;
    let download_name = completed_filename(&session.original_filename);
    info!(
        "Session {}: rendered '{download_name}' ({} bytes)",
        session.id,
        rendered.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        rendered,
    ))
}

/// `completed_<original>`, with characters that would break the header replaced.
pub fn completed_filename(original: &str) -> String {
    let safe: String = original
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    format!("completed_{safe}")
}

/// Drops any client-side directory components from an uploaded file name.
fn base_name(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim().to_string()
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_filename() {
        assert_eq!(completed_filename("nda.docx"), "completed_nda.docx");
        assert_eq!(completed_filename("a\"b.docx"), "completed_a_b.docx");
    }

    #[test]
    fn test_base_name_strips_client_paths() {
        assert_eq!(base_name("C:\\Users\\me\\safe.docx"), "safe.docx");
        assert_eq!(base_name("/tmp/x/nda.docx"), "nda.docx");
        assert_eq!(base_name("plain.docx"), "plain.docx");
    }
}
