// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Rule appended to every prompt that returns placeholder names.
pub const EXACT_NAMES_INSTRUCTION: &str = "\
    CRITICAL: Use placeholder names EXACTLY as listed, without brackets. \
    Never invent, merge, rename, or split placeholders.";

fn slot_pattern() -> &'static Regex {
    static SLOT: OnceLock<Regex> = OnceLock::new();
    SLOT.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("slot regex is valid"))
}

/// Fills `{slot}` markers in a single pass. Substituted text is never scanned
/// again, so values that themselves contain `{message}` and the like stay literal.
/// Markers without a matching slot are left as written.
pub fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    slot_pattern()
        .replace_all(template, |caps: &Captures| {
            slots
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}
