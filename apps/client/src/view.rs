// Plain-text renderers for the terminal UI. Pure functions of session state.

use crate::models::{ConversationMessage, Placeholder, Role};

const PROGRESS_WIDTH: usize = 20;

pub fn render_message(message: &ConversationMessage) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();
    let mut out = format!("{speaker:>9} │ {first}");
    for line in lines {
        out.push_str(&format!("\n{:>9} │ {line}", ""));
    }
    out
}

pub fn render_transcript(conversation: &[ConversationMessage]) -> String {
    conversation
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One line per placeholder: check mark, name, and value or description.
pub fn render_fields(placeholders: &[Placeholder]) -> String {
    if placeholders.is_empty() {
        return "No fields detected.".to_string();
    }
    placeholders
        .iter()
        .map(|p| match (p.is_filled(), p.value.as_deref()) {
            (true, Some(value)) => format!("  [x] {}: {value}", p.display_name()),
            _ => match p.description.as_deref() {
                Some(hint) => format!("  [ ] {} ({hint})", p.display_name()),
                None => format!("  [ ] {}", p.display_name()),
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[#####---------------] 1/4 fields filled`
pub fn render_progress(filled: usize, total: usize) -> String {
    let done = if total == 0 {
        0
    } else {
        filled.min(total) * PROGRESS_WIDTH / total
    };
    format!(
        "[{}{}] {filled}/{total} fields filled",
        "#".repeat(done),
        "-".repeat(PROGRESS_WIDTH - done)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(name: &str, value: Option<&str>) -> Placeholder {
        Placeholder {
            name: name.to_string(),
            filled: value.is_some(),
            value: value.map(str::to_string),
            description: Some(format!("Please provide: {}", name.to_lowercase())),
            ..Placeholder::default()
        }
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(
            render_progress(1, 4),
            "[#####---------------] 1/4 fields filled"
        );
        assert_eq!(
            render_progress(0, 0),
            "[--------------------] 0/0 fields filled"
        );
    }

    #[test]
    fn test_fields_show_values_and_hints() {
        let text = render_fields(&[
            placeholder("Company Name", Some("Acme Corp")),
            placeholder("Date", None),
        ]);
        assert_eq!(
            text,
            "  [x] Company Name: Acme Corp\n  [ ] Date (Please provide: date)"
        );
    }

    #[test]
    fn test_multiline_message_is_indented() {
        let rendered = render_message(&ConversationMessage::assistant("one\ntwo"));
        assert_eq!(rendered, "assistant │ one\n          │ two");
    }
}
