//! # sheetdoc-parser
//!
//! Spreadsheet input for the sheetdoc engine.
//!
//! This crate provides:
//! - Workbook loading (xlsx, xlsm, xlsb, xls, ods) into a [`RawTable`]
//! - The header normalizer that flattens a two-row header into column identifiers
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetdoc_core::HeaderRows;
//! use sheetdoc_parser::{load_workbook, normalize_headers};
//!
//! let raw = load_workbook(Path::new("activities.xlsx"))?;
//! let table = normalize_headers(&raw, HeaderRows::new(3, 4))?;
//! for column in table.columns() {
//!     println!("{column}");
//! }
//! ```

pub mod normalize;
pub mod workbook;

pub use normalize::{normalize_headers, PLACEHOLDER_TOKEN};
pub use workbook::{load_workbook, load_workbook_from_bytes};

use sheetdoc_core::RawTable;
use std::path::PathBuf;
use thiserror::Error;

/// Spreadsheet parsing error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to open workbook {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Workbook contains no worksheets")]
    NoWorksheet,

    #[error("Failed to read worksheet: {0}")]
    Worksheet(String),

    #[error("Header row {row} is outside the sheet ({height} rows)")]
    HeaderOutOfRange { row: usize, height: usize },
}

/// Supported spreadsheet formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Office Open XML workbook (.xlsx, .xlsm, .xlsb)
    OfficeOpenXml,
    /// Legacy binary workbook (.xls)
    Legacy,
    /// OpenDocument spreadsheet (.ods)
    OpenDocument,
    /// Anything else; left to content sniffing
    Unknown,
}

/// Detect spreadsheet format from extension
pub fn detect_format(path: &std::path::Path) -> FileFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("xlsx" | "xlsm" | "xlsb") => FileFormat::OfficeOpenXml,
        Some("xls") => FileFormat::Legacy,
        Some("ods") => FileFormat::OpenDocument,
        _ => FileFormat::Unknown,
    }
}

/// Load a workbook and normalize its header block in one step
pub fn parse_file(
    path: &std::path::Path,
    header_rows: sheetdoc_core::HeaderRows,
) -> Result<(RawTable, sheetdoc_core::NormalizedTable), ParseError> {
    let raw = load_workbook(path)?;
    let table = normalize_headers(&raw, header_rows)?;
    Ok((raw, table))
}
