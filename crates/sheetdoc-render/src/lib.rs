//! # sheetdoc-render
//!
//! WordprocessingML (.docx) backend for the sheetdoc engine.
//!
//! This crate provides:
//! - A zip package reader/writer with deterministic output
//! - An owned XML tree for the main document part
//! - Paragraph and table editing helpers (text, cells, appended rows)
//! - [`DocxTemplate`], the [`DocumentBuilder`](sheetdoc_core::DocumentBuilder)
//!   that fills a template for one organizational unit
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetdoc_core::{DocumentBuilder, VariantConfig};
//! use sheetdoc_render::DocxTemplate;
//!
//! let config = VariantConfig::budget();
//! let template = DocxTemplate::open(Path::new("budget_template.docx"), &config)?;
//! let bytes = template.build(&job, &ctx)?;
//! std::fs::write("Kandy.docx", bytes)?;
//! ```

pub mod document;
pub mod package;
pub mod template;
pub mod xml;

pub use document::DocxDocument;
pub use package::{DocxPackage, PackageEntry};
pub use template::DocxTemplate;
pub use xml::{Element, Node, XmlDocument, XmlError};
