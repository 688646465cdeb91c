//! Regenerates a `.docx` with every placeholder replaced by its committed value.

use std::collections::BTreeMap;
use std::ops::Range;

use quick_xml::escape::escape;
use thiserror::Error;
use tracing::{info, warn};

use crate::document::package::{DocxError, DocxPackage};
use crate::document::placeholders::placeholder_pattern;
use crate::document::text::scan_paragraphs;
use crate::models::Placeholder;

const PRESERVE_ATTR: &str = r#" xml:space="preserve""#;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unfilled placeholders: {}", .0.join(", "))]
    Unfilled(Vec<String>),

    #[error(transparent)]
    Docx(#[from] DocxError),
}

/// Renders the completed document.
///
/// Every placeholder must be filled; otherwise nothing is rendered and the
/// unfilled names are returned.
pub fn render_document(document: &[u8], placeholders: &[Placeholder]) -> Result<Vec<u8>, RenderError> {
    let unfilled: Vec<String> = placeholders
        .iter()
        .filter(|p| !p.is_filled())
        .map(|p| p.name.clone())
        .collect();
    if !unfilled.is_empty() {
        return Err(RenderError::Unfilled(unfilled));
    }

    let values: BTreeMap<&str, &str> = placeholders
        .iter()
        .filter_map(|p| Some((p.name.as_str(), p.value.as_deref()?)))
        .collect();

    let mut package = DocxPackage::from_bytes(document)?;
    let mut counts: BTreeMap<&str, usize> = values.keys().map(|k| (*k, 0)).collect();

    for part in package.text_parts() {
        let rewritten = fill_part(package.xml_part(&part)?, &values, &mut counts)?;
        if let Some(xml) = rewritten {
            package.replace_part(&part, xml.into_bytes())?;
        }
    }

    for (name, count) in &counts {
        if *count == 0 {
            warn!("Placeholder [{name}] was not found in the document");
        }
    }
    info!(
        "Rendered document: {} replacements across {} placeholders",
        counts.values().sum::<usize>(),
        counts.len()
    );

    Ok(package.to_bytes()?)
}

/// Applies replacements to one XML part. Returns `None` when nothing matched.
fn fill_part<'v>(
    xml: &str,
    values: &BTreeMap<&'v str, &'v str>,
    counts: &mut BTreeMap<&'v str, usize>,
) -> Result<Option<String>, DocxError> {
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();

    for paragraph in scan_paragraphs(xml)? {
        let text = paragraph.text();
        let matches: Vec<(Range<usize>, &str)> = placeholder_pattern()
            .captures_iter(&text)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let (name, value) = values.get_key_value(c.get(1)?.as_str().trim())?;
                if let Some(count) = counts.get_mut(name) {
                    *count += 1;
                }
                Some((whole.range(), *value))
            })
            .collect();
        if matches.is_empty() {
            continue;
        }

        let mut offset = 0;
        for run in &paragraph.runs {
            let span = offset..offset + run.text.len();
            offset = span.end;

            let mut touched = false;
            let mut out = String::new();
            let mut pos = span.start;
            for (m, value) in matches
                .iter()
                .filter(|(m, _)| m.end > span.start && m.start < span.end)
            {
                touched = true;
                if m.start >= span.start {
                    out.push_str(&text[pos..m.start]);
                    out.push_str(value);
                }
                pos = m.end.min(span.end);
            }
            if !touched {
                continue;
            }
            out.push_str(&text[pos..span.end]);

            if !run.preserve_space && out.trim() != out {
                edits.push((run.attr_insert_at..run.attr_insert_at, PRESERVE_ATTR.to_string()));
            }
            edits.push((run.content.clone(), escape(out.as_str()).into_owned()));
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }

    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut rewritten = xml.to_string();
    for (range, replacement) in edits {
        rewritten.replace_range(range, &replacement);
    }
    Ok(Some(rewritten))
}
