//! Reading and writing the `.docx` zip container.

use std::io::{Cursor, Read, Write};

use thiserror::Error;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// Main body part; every valid `.docx` has one.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Ceiling on the summed uncompressed size of all entries.
pub const MAX_UNCOMPRESSED_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing package part '{0}'")]
    MissingPart(String),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("package expands beyond {0} bytes")]
    TooLarge(u64),
}

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// An opened `.docx` package. Entry order is preserved on write.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        Self::from_bytes_with_limit(bytes, MAX_UNCOMPRESSED_BYTES)
    }

    /// Opens a package, failing with [`DocxError::TooLarge`] once the entries
    /// inflate past `limit` bytes in total. Declared entry sizes are not trusted.
    pub fn from_bytes_with_limit(bytes: &[u8], limit: u64) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut remaining = limit;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::new();
            file.by_ref()
                .take(remaining.saturating_add(1))
                .read_to_end(&mut data)?;
            let inflated = data.len() as u64;
            if inflated > remaining {
                return Err(DocxError::TooLarge(limit));
            }
            remaining -= inflated;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                compression: file.compression(),
                is_dir: file.is_dir(),
                data,
            });
        }

        let package = Self { entries };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(DocxError::MissingPart(DOCUMENT_PART.to_string()));
        }
        Ok(package)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                writer.add_directory(entry.name.clone(), options)?;
            } else {
                writer.start_file(entry.name.clone(), options)?;
                writer.write_all(&entry.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Returns the part as UTF-8 XML.
    pub fn xml_part(&self, name: &str) -> Result<&str, DocxError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
        std::str::from_utf8(data).map_err(|e| DocxError::Xml(format!("{name}: {e}")))
    }

    pub fn replace_part(&mut self, name: &str, data: Vec<u8>) -> Result<(), DocxError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
        entry.data = data;
        Ok(())
    }

    /// Parts that carry visible text: the body first, then headers and footers.
    pub fn text_parts(&self) -> Vec<String> {
        let mut extra: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|n| {
                n.ends_with(".xml")
                    && (n.starts_with("word/header") || n.starts_with("word/footer"))
            })
            .map(String::from)
            .collect();
        extra.sort();

        let mut parts = vec![DOCUMENT_PART.to_string()];
        parts.extend(extra);
        parts
    }
}
