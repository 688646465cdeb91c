//! Run-level view of WordprocessingML text.
//!
//! A paragraph's visible text is the concatenation of its `w:t` runs. Word
//! frequently splits one logical string (`[Company Name]`) across several runs,
//! so placeholder matching happens on the concatenation while edits are mapped
//! back onto byte spans of the original XML.

use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::document::package::DocxError;

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// One `w:t` element with text content.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Byte span of the escaped content between `<w:t ...>` and `</w:t>`.
    pub content: Range<usize>,
    /// Byte offset just past the element name inside the start tag, where attributes go.
    pub attr_insert_at: usize,
    pub preserve_space: bool,
    /// Unescaped text.
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Scans an XML part and returns its paragraphs in document order.
/// Nested paragraphs (text boxes) are returned separately from their host paragraph.
pub fn scan_paragraphs(xml: &str) -> Result<Vec<Paragraph>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Paragraph> = Vec::new();
    let mut done: Vec<Paragraph> = Vec::new();
    let mut pending_tag: Option<(usize, bool)> = None;

    loop {
        let event_start = offset(reader.buffer_position());
        let event = reader
            .read_event()
            .map_err(|e| DocxError::Xml(e.to_string()))?;
        let event_end = offset(reader.buffer_position());

        match event {
            Event::Start(start) if start.name().as_ref() == PARAGRAPH => {
                open.push(Paragraph::default());
            }
            Event::End(end) if end.name().as_ref() == PARAGRAPH => {
                if let Some(paragraph) = open.pop() {
                    done.push(paragraph);
                }
            }
            Event::Start(start) if start.name().as_ref() == TEXT => {
                // `raw` is the tag body between `<` and `>`; the reader sits just past `>`.
                let raw: &[u8] = &start;
                let inner = event_end
                    .and_then(|end| end.checked_sub(raw.len() + 1))
                    .and_then(|at| checked_span(xml, at, raw))
                    .ok_or_else(|| DocxError::Xml("unable to locate w:t tag".to_string()))?;
                let preserve = start
                    .try_get_attribute("xml:space")
                    .map_err(|e| DocxError::Xml(e.to_string()))?
                    .is_some_and(|a| a.value.as_ref() == b"preserve");
                pending_tag = Some((inner.start + TEXT.len(), preserve));
            }
            Event::End(end) if end.name().as_ref() == TEXT => {
                pending_tag = None;
            }
            Event::Text(text) => {
                let Some((attr_insert_at, preserve_space)) = pending_tag else {
                    continue;
                };
                // Text always follows markup, so it begins where the previous event ended.
                let raw: &[u8] = &text;
                let content = event_start
                    .and_then(|at| checked_span(xml, at, raw))
                    .ok_or_else(|| DocxError::Xml("unable to locate w:t text".to_string()))?;
                let unescaped = text.unescape().map_err(|e| DocxError::Xml(e.to_string()))?;
                if let Some(paragraph) = open.last_mut() {
                    paragraph.runs.push(TextRun {
                        content,
                        attr_insert_at,
                        preserve_space,
                        text: unescaped.into_owned(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Text boxes close before their host paragraph; restore document order.
    done.sort_by_key(|p| p.runs.first().map(|r| r.content.start).unwrap_or(usize::MAX));
    Ok(done)
}

/// Plain text of a part: non-empty paragraphs joined by newlines.
pub fn part_text(xml: &str) -> Result<String, DocxError> {
    let lines: Vec<String> = scan_paragraphs(xml)?
        .iter()
        .map(Paragraph::text)
        .filter(|t| !t.trim().is_empty())
        .collect();
    Ok(lines.join("\n"))
}

fn offset<P: TryInto<usize>>(position: P) -> Option<usize> {
    position.try_into().ok()
}

/// `start..start + raw.len()` if `xml` holds exactly `raw` there.
fn checked_span(xml: &str, start: usize, raw: &[u8]) -> Option<Range<usize>> {
    let end = start.checked_add(raw.len())?;
    (xml.as_bytes().get(start..end)? == raw).then_some(start..end)
}
