//! # sheetdoc-core
//!
//! Core domain model and traits for the sheetdoc document generation engine.
//!
//! This crate provides:
//! - Domain types: `RawTable`, `NormalizedTable`, `ActivityGroups`, `ResolvedDate`
//! - Variant configuration: `VariantConfig` with the built-in presets
//! - The `DocumentBuilder` seam between the engine and a document backend
//! - Text helpers shared by every stage (`clean_name`, `title_case`)
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use sheetdoc_core::{ActivityGroups, ColumnRef, Role, clean_name};
//!
//! let id = format!("{}_{}", clean_name("Community Outreach"), clean_name("No. Identified"));
//! assert_eq!(id, "community_outreach_no_identified");
//!
//! let mut groups = ActivityGroups::new();
//! groups.assign("community_outreach", Role::Target, ColumnRef::new(id, 2));
//! assert_eq!(groups.len(), 1);
//! ```

pub mod config;
pub mod text;

pub use config::{
    ColumnMatch, DateSource, HeaderRows, NumericPolicy, Placeholders, SuffixRule, TableLayout,
    Variant, VariantConfig,
};
pub use text::{clean_name, completion_percentage, display_number, title_case};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Sentinel rendered when no spreadsheet date could be resolved
pub const UNKNOWN_DATE: &str = "Unknown Date";

// ============================================================================
// Cells and Tables
// ============================================================================

/// A single spreadsheet cell value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// True only for cells that hold no value at all
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Copy of the cell with surrounding whitespace removed from text
    pub fn trimmed(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(s.trim().to_string()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => f.write_str(&display_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
        }
    }
}

/// The first worksheet of a workbook, addressed by absolute sheet position
///
/// Rows may have different lengths; missing cells read as [`CellValue::Empty`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the table
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// One data row of a normalized table
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedRow {
    /// Absolute sheet row this data came from
    pub source_row: usize,
    /// One value per normalized column
    pub cells: Vec<CellValue>,
}

impl NormalizedRow {
    pub fn get(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }
}

/// A table with flattened, cleaned column identifiers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn new(columns: Vec<String>, rows: Vec<NormalizedRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    /// Position of the first column with the given identifier
    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == id)
    }

    /// Drop every row whose `column` cell reads exactly as `marker`
    pub fn without_marker_rows(mut self, column: usize, marker: &str) -> Self {
        self.rows
            .retain(|row| !matches!(row.get(column), CellValue::Text(s) if s == marker));
        self
    }
}

// ============================================================================
// Activity Groups
// ============================================================================

/// Which side of an activity a column feeds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Planned count or budgeted amount
    Target,
    /// Achieved count or utilized amount
    Completed,
}

/// Reference to a normalized column
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub id: String,
    pub index: usize,
}

impl ColumnRef {
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

/// The columns that feed one logical activity
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityGroup {
    /// Base activity name (normalized identifier minus its role suffix)
    pub name: String,
    pub target: Option<ColumnRef>,
    pub completed: Option<ColumnRef>,
}

impl ActivityGroup {
    pub fn column(&self, role: Role) -> Option<&ColumnRef> {
        match role {
            Role::Target => self.target.as_ref(),
            Role::Completed => self.completed.as_ref(),
        }
    }
}

/// Activity groups in first-seen order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityGroups {
    groups: Vec<ActivityGroup>,
    by_name: HashMap<String, usize>,
}

impl ActivityGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `column` as the `role` side of `base`.
    ///
    /// A second column claiming the same role for the same base replaces the first.
    pub fn assign(&mut self, base: &str, role: Role, column: ColumnRef) {
        let index = match self.by_name.get(base) {
            Some(&index) => index,
            None => {
                self.groups.push(ActivityGroup {
                    name: base.to_string(),
                    target: None,
                    completed: None,
                });
                self.by_name.insert(base.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[index];
        match role {
            Role::Target => group.target = Some(column),
            Role::Completed => group.completed = Some(column),
        }
    }

    pub fn get(&self, base: &str) -> Option<&ActivityGroup> {
        self.by_name.get(base).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// First group, in iteration order, that has a completed column
    pub fn first_completed(&self) -> Option<&ColumnRef> {
        self.groups.iter().find_map(|g| g.completed.as_ref())
    }
}

impl<'a> IntoIterator for &'a ActivityGroups {
    type Item = &'a ActivityGroup;
    type IntoIter = std::slice::Iter<'a, ActivityGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

// ============================================================================
// Dates
// ============================================================================

/// The "as at" date of a spreadsheet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedDate {
    /// Parsed date with the text it renders as (`DD-MM-YY` or `DD-MM-YYYY`)
    Parsed { date: NaiveDate, text: String },
    /// No token was found or none of the accepted formats matched
    Unknown,
}

impl ResolvedDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Parsed { date, .. } => Some(*date),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

impl fmt::Display for ResolvedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed { text, .. } => f.write_str(text),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Target and completed values of one activity for one unit
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivityMeasure {
    /// Base activity name, used to match template rows
    pub name: String,
    pub target: f64,
    pub completed: f64,
}

impl ActivityMeasure {
    pub fn new(name: impl Into<String>, target: f64, completed: f64) -> Self {
        Self {
            name: name.into(),
            target,
            completed,
        }
    }

    /// Row label used when the activity is appended to a table
    pub fn label(&self) -> String {
        title_case(&self.name)
    }

    /// The `[target, completed, percentage]` cell texts
    pub fn cells(&self) -> [String; 3] {
        [
            display_number(self.target),
            display_number(self.completed),
            completion_percentage(self.target, self.completed),
        ]
    }
}

/// Everything needed to produce the document of one unit
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentJob {
    /// Display name of the organizational unit
    pub unit: String,
    /// One measure per activity group, in grouping order
    pub measures: Vec<ActivityMeasure>,
}

/// Values shared by every document of one generation run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationContext {
    /// Spreadsheet-derived "as at" date
    pub resolved_date: ResolvedDate,
    /// Date the documents are stamped with
    pub processing_date: NaiveDate,
}

/// A generated document keyed by its unit
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedDocument<T> {
    pub unit: String,
    pub document: T,
}

/// Generated documents in spreadsheet row order
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedBatch<T> {
    documents: Vec<GeneratedDocument<T>>,
}

impl<T> GeneratedBatch<T> {
    pub fn new(documents: Vec<GeneratedDocument<T>>) -> Self {
        Self { documents }
    }

    pub fn get(&self, unit: &str) -> Option<&T> {
        self.documents
            .iter()
            .find(|d| d.unit == unit)
            .map(|d| &d.document)
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.unit.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedDocument<T>> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<T> IntoIterator for GeneratedBatch<T> {
    type Item = GeneratedDocument<T>;
    type IntoIter = std::vec::IntoIter<GeneratedDocument<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Document backend
///
/// Implementations must build every document from their own immutable
/// template; a call never observes the state of another call.
pub trait DocumentBuilder: Send + Sync {
    type Output: Send;

    /// Build the document for one unit
    fn build(&self, job: &DocumentJob, ctx: &GenerationContext)
        -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Structural problem with a document template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template part not found: {0}")]
    MissingPart(String),

    #[error("Template has no table at index {0}")]
    MissingTable(usize),

    #[error("Table row {row} has {cells} cells, at least {required} required")]
    RowTooShort {
        row: usize,
        cells: usize,
        required: usize,
    },

    #[error("Placeholder not found in any paragraph: {0:?}")]
    MissingPlaceholder(String),
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Unknown variant preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid suffix pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cell_display() {
        assert_eq!(CellValue::Number(40.0).to_string(), "40");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::text("North").to_string(), "North");
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn raw_table_missing_cells_are_empty() {
        let table = RawTable::new(vec![vec![CellValue::text("a")], vec![]]);
        assert_eq!(table.width(), 1);
        assert!(table.cell(1, 0).is_empty());
        assert!(table.cell(10, 10).is_empty());
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let mut groups = ActivityGroups::new();
        groups.assign("b", Role::Completed, ColumnRef::new("b_done", 2));
        groups.assign("a", Role::Target, ColumnRef::new("a_plan", 3));
        groups.assign("b", Role::Target, ColumnRef::new("b_plan", 1));

        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(groups.get("b").unwrap().target.as_ref().unwrap().index, 1);
    }

    #[test]
    fn later_column_wins_same_role() {
        let mut groups = ActivityGroups::new();
        groups.assign("a", Role::Target, ColumnRef::new("a_x", 1));
        groups.assign("a", Role::Target, ColumnRef::new("a_y", 4));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("a").unwrap().target, Some(ColumnRef::new("a_y", 4)));
    }

    #[test]
    fn first_completed_skips_target_only_groups() {
        let mut groups = ActivityGroups::new();
        groups.assign("a", Role::Target, ColumnRef::new("a_plan", 1));
        groups.assign("b", Role::Completed, ColumnRef::new("b_completed_upto_150324", 2));

        assert_eq!(groups.first_completed().unwrap().id, "b_completed_upto_150324");
    }

    #[test]
    fn total_rows_are_dropped() {
        let table = NormalizedTable::new(
            vec!["unit".into()],
            vec![
                NormalizedRow {
                    source_row: 5,
                    cells: vec![CellValue::text("North")],
                },
                NormalizedRow {
                    source_row: 6,
                    cells: vec![CellValue::text("Totals")],
                },
            ],
        )
        .without_marker_rows(0, "Totals");

        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].source_row, 5);
    }

    #[test]
    fn measure_cells() {
        let measure = ActivityMeasure::new("community_outreach", 40.0, 25.0);
        assert_eq!(measure.label(), "Community Outreach");
        assert_eq!(measure.cells(), ["40".to_string(), "25".into(), "62.5%".into()]);
    }

    #[test]
    fn resolved_date_display() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let parsed = ResolvedDate::Parsed {
            date,
            text: "15-03-24".into(),
        };
        assert_eq!(parsed.to_string(), "15-03-24");
        assert_eq!(ResolvedDate::Unknown.to_string(), "Unknown Date");
        assert!(!ResolvedDate::Unknown.is_known());
    }

    #[test]
    fn batch_lookup_by_unit() {
        let batch = GeneratedBatch::new(vec![
            GeneratedDocument {
                unit: "North".into(),
                document: 1,
            },
            GeneratedDocument {
                unit: "South".into(),
                document: 2,
            },
        ]);
        assert_eq!(batch.get("South"), Some(&2));
        assert_eq!(batch.units().collect::<Vec<_>>(), vec!["North", "South"]);
    }
}
