//! OPC package (zip container) handling.
//!
//! Entries are kept in archive order and written back with a fixed timestamp
//! so identical content always produces identical bytes.

use sheetdoc_core::{RenderError, TemplateError};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::xml::XmlDocument;

const PACKAGE_RELS: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// One file inside the package
#[derive(Clone, Debug, PartialEq)]
pub struct PackageEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// An in-memory docx package
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| RenderError::Archive(e.to_string()))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| RenderError::Archive(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                data,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Replace an existing entry or append a new one
    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(PackageEntry {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Path of the main document part, resolved through the package relationships
    pub fn main_part_name(&self) -> Result<String, RenderError> {
        let target = self
            .get(PACKAGE_RELS)
            .map(XmlDocument::parse)
            .transpose()?
            .and_then(|rels| {
                rels.root
                    .children_named("Relationship")
                    .find(|r| r.attr("Type") == Some(OFFICE_DOCUMENT_REL))
                    .and_then(|r| r.attr("Target"))
                    .map(|t| t.trim_start_matches('/').to_string())
            })
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());

        if self.get(&target).is_none() {
            return Err(TemplateError::MissingPart(target).into());
        }
        Ok(target)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let timestamp = DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
            .map_err(|e| RenderError::Archive(e.to_string()))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(timestamp);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| RenderError::Archive(e.to_string()))?;
            writer.write_all(&entry.data)?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| RenderError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
