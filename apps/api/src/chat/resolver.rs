//! Chat resolution: turns one user utterance into extracted placeholder values
//! and the assistant's reply.
//!
//! `AppState` holds an `Arc<dyn ChatResolver>`, chosen at startup:
//! `LlmChatResolver` when an API key is configured, `KeywordChatResolver` otherwise.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::chat::prompts::RESOLVE_SYSTEM_TEMPLATE;
use crate::chat::scoring::best_match;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, EXACT_NAMES_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::{ConversationMessage, Placeholder};

pub const ALL_FILLED_MESSAGE: &str = "All fields are now filled! Ready to download your document.";

/// Outcome of one chat turn, before the server merges it into the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub assistant_message: String,
    /// Placeholder name (as the resolver spelled it) -> extracted value.
    pub filled_values: BTreeMap<String, String>,
    pub next_question: Option<String>,
}

impl Resolution {
    pub fn all_filled() -> Self {
        Self {
            assistant_message: ALL_FILLED_MESSAGE.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ChatResolver: Send + Sync {
    /// `history` is the server-side conversation so far, excluding `message`.
    async fn resolve(
        &self,
        message: &str,
        placeholders: &[Placeholder],
        history: &[ConversationMessage],
    ) -> Result<Resolution, AppError>;

    /// "llm" | "keyword"
    fn backend(&self) -> &'static str;
}

pub(crate) fn unfilled(placeholders: &[Placeholder]) -> Vec<&Placeholder> {
    placeholders.iter().filter(|p| !p.is_filled()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// LlmChatResolver
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmChatResolver(pub LlmClient);

#[derive(Debug, Deserialize)]
struct LlmResolution {
    #[serde(default)]
    assistant_message: Option<String>,
    #[serde(default)]
    filled_values: BTreeMap<String, Value>,
    #[serde(default)]
    next_question: Option<String>,
}

impl From<LlmResolution> for Resolution {
    fn from(raw: LlmResolution) -> Self {
        let filled_values = raw
            .filled_values
            .into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some((name, value))
            })
            .collect();

        Resolution {
            assistant_message: raw
                .assistant_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Got it.".to_string()),
            filled_values,
            next_question: raw.next_question.filter(|q| !q.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ChatResolver for LlmChatResolver {
    async fn resolve(
        &self,
        message: &str,
        placeholders: &[Placeholder],
        history: &[ConversationMessage],
    ) -> Result<Resolution, AppError> {
        let open = unfilled(placeholders);
        if open.is_empty() {
            return Ok(Resolution::all_filled());
        }

        let system = build_system_prompt(message, placeholders, &open);

        let mut messages = history.to_vec();
        messages.push(ConversationMessage::user(message));

        let raw: LlmResolution = self
            .0
            .call_conversation_json(&messages, &system)
            .await
            .map_err(|e| AppError::Llm(format!("Chat resolution failed: {e}")))?;
        let resolution = Resolution::from(raw);

        info!(
            "LLM extracted {} value(s), next question: {}",
            resolution.filled_values.len(),
            resolution.next_question.as_deref().unwrap_or("none")
        );
        Ok(resolution)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

fn build_system_prompt(message: &str, placeholders: &[Placeholder], open: &[&Placeholder]) -> String {
    let filled: Vec<String> = placeholders
        .iter()
        .filter(|p| p.is_filled())
        .map(|p| format!("\"{}\" = \"{}\"", p.name, p.value.as_deref().unwrap_or_default()))
        .collect();
    let filled = if filled.is_empty() {
        "None yet".to_string()
    } else {
        filled.join("\n")
    };

    let unfilled_list = open
        .iter()
        .map(|p| format!("\"{}\" (Type: {})", p.name, type_label(p)))
        .collect::<Vec<_>>()
        .join("\n");

    // `open` is non-empty here, so best_match always yields a focus.
    let (focus_name, focus_type, focus_description) = match best_match(message, open) {
        Some((focus, score)) => {
            debug!("Current focus: {} ({score} points)", focus.name);
            (
                focus.name.as_str(),
                type_label(focus),
                focus.description.as_deref().unwrap_or("Field"),
            )
        }
        None => ("", "text".to_string(), "Field"),
    };

    fill_template(
        RESOLVE_SYSTEM_TEMPLATE,
        &[
            ("filled", filled.as_str()),
            ("unfilled", unfilled_list.as_str()),
            ("focus_name", focus_name),
            ("focus_type", focus_type.as_str()),
            ("focus_description", focus_description),
            ("exact_names_instruction", EXACT_NAMES_INSTRUCTION),
            ("message", message),
        ],
    )
}

fn type_label(placeholder: &Placeholder) -> String {
    serde_json::to_value(placeholder.field_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "text".to_string())
}
