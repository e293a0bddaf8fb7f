//! # sheetdoc-engine
//!
//! Spreadsheet-to-document generation engine.
//!
//! This crate provides:
//! - Activity column grouping driven by suffix rules
//! - "As at" date resolution from column identifiers or a title cell
//! - The generation driver: one document per organizational unit row,
//!   sequential or on the rayon thread pool
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetdoc_core::VariantConfig;
//! use sheetdoc_engine::generate_from_path;
//!
//! let config = VariantConfig::strategic_activities();
//! let batch = generate_from_path(
//!     Path::new("activities.xlsx"),
//!     Path::new("template.docx"),
//!     &config,
//! )?;
//! for doc in batch {
//!     std::fs::write(format!("{}.docx", doc.unit), doc.document)?;
//! }
//! ```

pub mod date;
pub mod driver;
pub mod grouping;

pub use date::{parse_date_token, resolve_date};
pub use driver::{prepare, Driver, Prepared};
pub use grouping::ActivityGrouper;

use sheetdoc_core::{ConfigError, GeneratedBatch, RawTable, RenderError, VariantConfig};
use sheetdoc_parser::{load_workbook, load_workbook_from_bytes, ParseError};
use sheetdoc_render::DocxTemplate;
use std::path::Path;
use thiserror::Error;

/// Generation error
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid template: {0}")]
    Template(#[from] RenderError),

    #[error("Failed to build document for {unit}: {source}")]
    Document {
        unit: String,
        #[source]
        source: RenderError,
    },

    /// `row` is the 1-based sheet row
    #[error("Row {row} has no unit name")]
    MissingUnitName { row: usize },

    #[error("Unit {0:?} appears on more than one row")]
    DuplicateUnit(String),

    #[error("Non-numeric value {value:?} in column {column} for unit {unit}")]
    NonNumeric {
        unit: String,
        column: String,
        value: String,
    },
}

/// Generate every document from a spreadsheet file and a template file,
/// stamped with today's date
pub fn generate_from_path(
    spreadsheet: &Path,
    template: &Path,
    config: &VariantConfig,
) -> Result<GeneratedBatch<Vec<u8>>, EngineError> {
    let raw = load_workbook(spreadsheet)?;
    generate(&raw, template, config)
}

/// Like [`generate_from_path`] for an in-memory spreadsheet
pub fn generate_from_bytes(
    spreadsheet: &[u8],
    template: &Path,
    config: &VariantConfig,
) -> Result<GeneratedBatch<Vec<u8>>, EngineError> {
    let raw = load_workbook_from_bytes(spreadsheet)?;
    generate(&raw, template, config)
}

fn generate(
    raw: &RawTable,
    template: &Path,
    config: &VariantConfig,
) -> Result<GeneratedBatch<Vec<u8>>, EngineError> {
    let template = DocxTemplate::open(template, config)?;
    Driver::new(config.clone(), template).run(raw, chrono::Local::now().date_naive())
}
