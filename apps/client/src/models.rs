//! Wire types shared with the API, plus the client-local transcript entry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client copy of a placeholder. The server's copy is authoritative; this one is
/// replaced wholesale from every upload and chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholder {
    pub name: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub filled: bool,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Placeholder {
    pub fn is_filled(&self) -> bool {
        self.filled && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Name to show in the UI: the inferred name when the server supplied one.
    pub fn display_name(&self) -> &str {
        self.inferred_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Transcript entry. `id` is local only; it tags optimistic messages so a failed
/// send can remove exactly the message it added.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub filename: String,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: Uuid,
    pub message: &'a str,
    pub placeholders: &'a [Placeholder],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub assistant_message: String,
    #[serde(default)]
    pub filled_values: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    #[serde(default)]
    pub next_question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest<'a> {
    pub session_id: Uuid,
    pub placeholders: &'a [Placeholder],
}

/// `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
