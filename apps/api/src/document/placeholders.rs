//! Placeholder detection over a document's plain text.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::document::package::{DocxError, DocxPackage};
use crate::document::text::part_text;
use crate::models::Placeholder;

/// Characters of surrounding text kept on each side of a placeholder.
const CONTEXT_CHARS: usize = 100;

pub(crate) fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\[\]\n]+)\]").expect("placeholder regex is valid"))
}

/// Plain text of every text-bearing part, body first.
pub fn extract_text(package: &DocxPackage) -> Result<String, DocxError> {
    let mut sections = Vec::new();
    for part in package.text_parts() {
        let text = part_text(package.xml_part(&part)?)?;
        if !text.is_empty() {
            sections.push(text);
        }
    }
    Ok(sections.join("\n"))
}

/// Finds `[Bracketed]` placeholders in order of first occurrence.
///
/// Names are the trimmed inner text; repeats of a name are dropped. Bracket pairs
/// whose inner text is blank are not placeholders. A placeholder never spans
/// paragraphs or contains another `[`, matching what the renderer can replace.
pub fn find_placeholders(text: &str) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    let mut placeholders = Vec::new();

    for captures in placeholder_pattern().captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let name = inner.as_str().trim();
        if name.is_empty() || !seen.insert(name.to_string()) {
            continue;
        }

        let before = tail_chars(&text[..whole.start()], CONTEXT_CHARS);
        let after = head_chars(&text[whole.end()..], CONTEXT_CHARS);
        let context = format!("{before}{}{after}", whole.as_str());

        let mut placeholder = Placeholder::new(name, context.trim());
        placeholder.before = Some(before.trim().to_string());
        placeholder.after = Some(after.trim().to_string());
        placeholders.push(placeholder);
    }

    placeholders
}

fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
