//! Session client: owns the client-side session state and drives the
//! upload → chat → download cycle against the API.
//!
//! Every operation follows the same discipline:
//! - it is a silent no-op when its precondition (an open session) does not hold;
//! - `loading` is raised on entry and released on every exit path, including when
//!   the operation's future is dropped part-way;
//! - it runs under a deadline and can be aborted through [`SessionClient::cancellation_handle`];
//! - failures end up as one human-readable string in [`SessionClient::error`].
//!
//! Optimistic chat messages carry a local id. Rollback removes by that id, never
//! by position.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{ChatRequest, ConversationMessage, DownloadRequest, Placeholder};

/// Names listed in the greeting before collapsing into "and N more".
const GREETING_NAME_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
struct SessionState {
    session_id: Option<Uuid>,
    filename: String,
    placeholders: Vec<Placeholder>,
    conversation: Vec<ConversationMessage>,
    loading: bool,
    error: Option<String>,
}

/// Marks one operation in flight. Dropping it clears `loading` and, unless
/// committed, removes the tracked optimistic message.
struct InFlight<'a> {
    state: &'a mut SessionState,
    optimistic: Option<Uuid>,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a mut SessionState) -> Self {
        state.loading = true;
        state.error = None;
        Self {
            state,
            optimistic: None,
        }
    }

    fn push_optimistic(&mut self, message: ConversationMessage) {
        self.optimistic = Some(message.id);
        self.state.conversation.push(message);
    }

    fn commit(&mut self) {
        self.optimistic = None;
    }

    fn fail(&mut self, action: &str, error: ClientError) {
        warn!("{action} failed: {error}");
        self.state.error = Some(format!("{action} failed: {error}"));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.optimistic.take() {
            self.state.conversation.retain(|m| m.id != id);
            debug!("Rolled back optimistic message {id}");
        }
        self.state.loading = false;
    }
}

/// Runs `op` until it finishes, the deadline passes, or `cancel` fires.
async fn guarded<T>(
    deadline: Duration,
    cancel: &CancellationToken,
    op: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        outcome = tokio::time::timeout(deadline, op) => match outcome {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(deadline)),
        },
    }
}

pub struct SessionClient {
    api: ApiClient,
    request_timeout: Duration,
    cancel: CancellationToken,
    state: SessionState,
}

impl SessionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            api: ApiClient::new(config.api_base_url.clone())?,
            request_timeout: config.request_timeout,
            cancel: CancellationToken::new(),
            state: SessionState::default(),
        })
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.state.session_id
    }

    pub fn filename(&self) -> &str {
        &self.state.filename
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.state.placeholders
    }

    pub fn conversation(&self) -> &[ConversationMessage] {
        &self.state.conversation
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn filled_count(&self) -> usize {
        self.state.placeholders.iter().filter(|p| p.is_filled()).count()
    }

    pub fn total_count(&self) -> usize {
        self.state.placeholders.len()
    }

    /// True when there is at least one placeholder and all are filled.
    pub fn is_complete(&self) -> bool {
        let placeholders = &self.state.placeholders;
        !placeholders.is_empty() && placeholders.iter().all(Placeholder::is_filled)
    }

    pub fn can_download(&self) -> bool {
        self.state.session_id.is_some() && self.is_complete() && !self.state.loading
    }

    /// Token that aborts the next or current operation when cancelled. Once
    /// cancelled it is spent: the next call here or the next operation starts a
    /// fresh one.
    pub fn cancellation_handle(&mut self) -> CancellationToken {
        self.refresh_token().clone()
    }

    fn refresh_token(&mut self) -> &CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        &self.cancel
    }

    /// Uploads a document and opens a session. On success the placeholder list is
    /// replaced and the transcript is seeded with a greeting. Returns whether the
    /// session opened.
    pub async fn upload_document(&mut self, filename: &str, bytes: Vec<u8>) -> bool {
        let token = self.refresh_token().clone();
        let mut flight = InFlight::begin(&mut self.state);

        match guarded(self.request_timeout, &token, self.api.upload(filename, bytes)).await {
            Ok(response) => {
                info!(
                    "Session {} opened for '{}' ({} placeholders)",
                    response.session_id,
                    response.filename,
                    response.placeholders.len()
                );
                let state = &mut *flight.state;
                state.conversation = vec![ConversationMessage::assistant(greeting(
                    &response.filename,
                    &response.placeholders,
                ))];
                state.session_id = Some(response.session_id);
                state.filename = response.filename;
                state.placeholders = response.placeholders;
                true
            }
            Err(e) => {
                flight.fail("Upload", e);
                false
            }
        }
    }

    /// Reads `path` and uploads it under its file name.
    pub async fn upload_path(&mut self, path: &Path) -> bool {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match tokio::fs::read(path).await {
            Ok(bytes) => self.upload_document(&filename, bytes).await,
            Err(e) => {
                self.state.error = Some(format!("Upload failed: {}", ClientError::Io(e)));
                false
            }
        }
    }

    /// Sends one chat turn. The user message appears in the transcript right away
    /// and is withdrawn again if the turn fails. Returns whether the turn succeeded.
    pub async fn send_message(&mut self, message: &str) -> bool {
        let Some(session_id) = self.state.session_id else {
            debug!("send_message ignored: no open session");
            return false;
        };
        let message = message.trim();
        if message.is_empty() {
            return false;
        }

        let token = self.refresh_token().clone();
        let mut flight = InFlight::begin(&mut self.state);
        flight.push_optimistic(ConversationMessage::user(message));

        let request = ChatRequest {
            session_id,
            message,
            placeholders: &flight.state.placeholders,
        };
        let result = guarded(self.request_timeout, &token, self.api.chat(&request)).await;

        match result {
            Ok(response) => {
                debug!(
                    "Chat turn committed {} value(s)",
                    response.filled_values.len()
                );
                flight.state.placeholders = response.placeholders;
                flight
                    .state
                    .conversation
                    .push(ConversationMessage::assistant(response.assistant_message));
                flight.commit();
                true
            }
            Err(e) => {
                flight.fail("Chat", e);
                false
            }
        }
    }

    /// Downloads the rendered document into `dir` as `completed_<filename>`.
    /// Nothing is written unless the whole body arrived. Returns the saved path.
    pub async fn download_document(&mut self, dir: &Path) -> Option<PathBuf> {
        let Some(session_id) = self.state.session_id else {
            debug!("download_document ignored: no open session");
            return None;
        };

        let token = self.refresh_token().clone();
        let target = dir.join(completed_filename(&self.state.filename));
        let mut flight = InFlight::begin(&mut self.state);

        let request = DownloadRequest {
            session_id,
            placeholders: &flight.state.placeholders,
        };
        let result = match guarded(self.request_timeout, &token, self.api.download(&request)).await
        {
            Ok(bytes) => save_file(&target, &bytes).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Saved {}", target.display());
                Some(target)
            }
            Err(e) => {
                flight.fail("Download", e);
                None
            }
        }
    }

    /// Abandons the current session locally. No request is made; the server
    /// session simply times out.
    pub fn reset_session(&mut self) {
        if let Some(id) = self.state.session_id {
            debug!("Resetting session {id}");
        }
        self.state = SessionState::default();
    }
}

/// Writes via a sibling temp file so a failed write never leaves a partial document.
async fn save_file(target: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

/// `completed_<base name>`, with path separators removed.
pub fn completed_filename(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    format!("completed_{base}")
}

/// Advisory suffix check for drag-and-drop style inputs. The server validates.
pub fn is_docx_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".docx")
}

/// Seeded assistant message shown right after a successful upload.
pub fn greeting(filename: &str, placeholders: &[Placeholder]) -> String {
    if placeholders.is_empty() {
        return format!(
            "I've loaded your document \"{filename}\", but I didn't find any [bracketed] fields to fill. \
             There is nothing to complete here; please upload a document that uses [Field Name] placeholders."
        );
    }

    let listed: Vec<String> = placeholders
        .iter()
        .take(GREETING_NAME_LIMIT)
        .map(|p| format!("- {}", p.name))
        .collect();
    let mut fields = listed.join("\n");
    if placeholders.len() > GREETING_NAME_LIMIT {
        fields.push_str(&format!(
            "\n...and {} more",
            placeholders.len() - GREETING_NAME_LIMIT
        ));
    }

    let count = placeholders.len();
    let noun = if count == 1 {
        "field that needs"
    } else {
        "fields that need"
    };
    format!(
        "I've loaded your document \"{filename}\".\n\n\
         I found {count} {noun} to be filled:\n{fields}\n\n\
         You can provide information for these fields one at a time, or all together. \
         How would you like to proceed?"
    )
}
