use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::placeholder::{self, Placeholder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Server-side record binding one uploaded document to its placeholders and history.
///
/// The placeholder list held here is authoritative; client-submitted lists are only
/// compared against it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub original_filename: String,
    pub document: Bytes,
    pub placeholders: Vec<Placeholder>,
    /// Exact placeholder name -> committed value.
    pub filled_values: BTreeMap<String, String>,
    pub conversation: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(original_filename: String, document: Bytes, placeholders: Vec<Placeholder>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_filename,
            document,
            placeholders,
            filled_values: BTreeMap::new(),
            conversation: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Fills the placeholder named `name` (see [`placeholder::position_by_name`]).
    /// Returns the exact stored name on success.
    pub fn commit_value(&mut self, name: &str, value: &str) -> Option<String> {
        let index =
            placeholder::position_by_name(self.placeholders.iter().map(|p| p.name.as_str()), name)?;
        let placeholder = &mut self.placeholders[index];
        if !placeholder.fill(value) {
            return None;
        }
        let exact = placeholder.name.clone();
        let committed = placeholder.value.clone().unwrap_or_default();
        self.filled_values.insert(exact.clone(), committed);
        Some(exact)
    }

    pub fn unfilled_names(&self) -> Vec<String> {
        self.placeholders
            .iter()
            .filter(|p| !p.is_filled())
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn progress(&self) -> (usize, usize) {
        placeholder::progress(&self.placeholders)
    }

    pub fn is_complete(&self) -> bool {
        placeholder::is_complete(&self.placeholders)
    }
}
