//! Deterministic chat resolver. No LLM call.
//!
//! Algorithm:
//! 1. Split the utterance into clauses on `;` and newlines.
//! 2. Each clause yields a value: the text after the first `is` / `are` / `:` / `=`,
//!    or the whole clause, with trailing punctuation stripped.
//! 3. The clause is scored against the still-open placeholders. The best scorer
//!    takes the value; a zero score falls back to the first open placeholder,
//!    which is the one the assistant asked for last.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::chat::resolver::{unfilled, ChatResolver, Resolution};
use crate::chat::scoring::best_match;
use crate::errors::AppError;
use crate::models::{ConversationMessage, Placeholder};

const SEPARATORS: [&str; 4] = [" is ", " are ", ":", "="];

pub struct KeywordChatResolver;

#[async_trait]
impl ChatResolver for KeywordChatResolver {
    async fn resolve(
        &self,
        message: &str,
        placeholders: &[Placeholder],
        _history: &[ConversationMessage],
    ) -> Result<Resolution, AppError> {
        Ok(resolve_keywords(message, placeholders))
    }

    fn backend(&self) -> &'static str {
        "keyword"
    }
}

fn resolve_keywords(message: &str, placeholders: &[Placeholder]) -> Resolution {
    let mut open = unfilled(placeholders);
    if open.is_empty() {
        return Resolution::all_filled();
    }

    let mut filled_values = BTreeMap::new();
    let mut acknowledged = Vec::new();

    for clause in split_clauses(message) {
        let value = clause_value(clause);
        if value.is_empty() || open.is_empty() {
            continue;
        }
        let target = match best_match(clause, &open) {
            Some((best, score)) if score > 0 => best,
            _ => open[0],
        };
        debug!("Clause '{clause}' -> [{}] = '{value}'", target.name);

        acknowledged.push(format!("the {} is {}", target.name, value));
        filled_values.insert(target.name.clone(), value.to_string());
        open.retain(|p| p.name != target.name);
    }

    let next_question = open.first().map(|p| p.name.clone());
    let assistant_message = compose_reply(&acknowledged, next_question.as_deref());

    Resolution {
        assistant_message,
        filled_values,
        next_question,
    }
}

fn compose_reply(acknowledged: &[String], next: Option<&str>) -> String {
    let mut reply = if acknowledged.is_empty() {
        "I couldn't identify which field you're trying to fill. Please be more specific.".to_string()
    } else {
        format!("Acknowledged, {}.", acknowledged.join(" and "))
    };

    match next {
        Some(name) => reply.push_str(&format!(" Next, please provide: {name}")),
        None => reply.push_str(" All fields are now filled! Ready to download your document."),
    }
    reply
}

fn split_clauses(message: &str) -> impl Iterator<Item = &str> {
    message
        .split([';', '\n'])
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
}

fn clause_value(clause: &str) -> &str {
    // ASCII lowering keeps byte offsets aligned with `clause`.
    let lower = clause.to_ascii_lowercase();
    let value = SEPARATORS
        .iter()
        .filter_map(|sep| lower.find(sep).map(|at| at + sep.len()))
        .min()
        .map_or(clause, |start| &clause[start..]);

    value
        .trim()
        .trim_end_matches(['.', ',', '!', '?'])
        .trim_matches('"')
        .trim()
}
