//! Workbook loading via calamine.
//!
//! Only the first worksheet is read. Cell positions stay absolute: calamine
//! ranges start at the first used cell, so leading blank rows and columns are
//! padded back in and header offsets keep meaning "row N of the sheet".

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use sheetdoc_core::{CellValue, RawTable};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::{detect_format, FileFormat, ParseError};

/// Load the first worksheet of a workbook file
pub fn load_workbook(path: &Path) -> Result<RawTable, ParseError> {
    let format = detect_format(path);
    debug!(path = %path.display(), ?format, "loading workbook");

    if format == FileFormat::Unknown {
        let bytes = std::fs::read(path).map_err(|e| ParseError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        return load_workbook_from_bytes(&bytes);
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| ParseError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoWorksheet)?
        .map_err(|e| ParseError::Worksheet(e.to_string()))?;

    Ok(range_to_table(&range))
}

/// Load the first worksheet of an in-memory workbook; the format is sniffed
pub fn load_workbook_from_bytes(bytes: &[u8]) -> Result<RawTable, ParseError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| ParseError::Open {
            path: "<memory>".into(),
            message: e.to_string(),
        })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoWorksheet)?
        .map_err(|e| ParseError::Worksheet(e.to_string()))?;

    Ok(range_to_table(&range))
}

fn range_to_table(range: &Range<Data>) -> RawTable {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); row_offset];
    for source in range.rows() {
        let mut row = vec![CellValue::Empty; col_offset];
        row.extend(source.iter().map(cell_value));
        rows.push(row);
    }

    debug!(
        rows = rows.len(),
        row_offset, col_offset, "worksheet loaded"
    );
    RawTable::new(rows)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Text(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
