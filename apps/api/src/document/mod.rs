// Document handling: .docx package I/O, placeholder detection, rendering.
// The package is treated as opaque apart from its WordprocessingML text parts.

pub mod handlers;
pub mod package;
pub mod placeholders;
pub mod render;
pub mod text;

pub use package::{DocxError, DocxPackage};
pub use placeholders::{extract_text, find_placeholders};
pub use render::{render_document, RenderError};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Advisory check only; the package itself is validated when opened.
pub fn is_docx_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".docx")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};

    use zip::{write::SimpleFileOptions, ZipWriter};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    /// Builds a minimal `.docx` whose body holds the given paragraph XML.
    pub fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        build_docx_with_parts(paragraphs, &[])
    }

    pub fn build_docx_with_parts(paragraphs: &[&str], extra: &[(&str, &str)]) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            paragraphs.concat()
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut parts = vec![
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", RELS.to_string()),
            ("word/document.xml", document),
        ];
        parts.extend(extra.iter().map(|(n, x)| (*n, x.to_string())));

        for (name, xml) in parts {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// One paragraph per line of text, each in a single run.
    pub fn docx_from_lines(lines: &[&str]) -> Vec<u8> {
        let paragraphs: Vec<String> = lines
            .iter()
            .map(|l| format!("<w:p><w:r><w:t xml:space=\"preserve\">{l}</w:t></w:r></w:p>"))
            .collect();
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        build_docx(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_filename_check_is_case_insensitive() {
        assert!(is_docx_filename("Agreement.DOCX"));
        assert!(is_docx_filename("safe.docx"));
        assert!(!is_docx_filename("safe.doc"));
        assert!(!is_docx_filename("docx"));
    }
}
