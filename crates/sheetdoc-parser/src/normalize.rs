//! Header normalization
//!
//! Flattens a two-row hierarchical header into one identifier per column:
//!
//! ```text
//! row 3 | Name of the Division | Community Outreach |                         | Community Outreach
//! row 4 |                      | No. Identified     | Completed upto 15.03.24 | %
//!       v
//! name_of_the_division_unnamed_0_level_1 | community_outreach_no_identified |
//! community_outreach_completed_upto_150324 | community_outreach_percentage
//! ```
//!
//! Each header row is forward-filled on its own: a blank label takes the last
//! non-blank label to its left in the same row. A blank with nothing to its
//! left becomes `Unnamed: {column}_level_{level}`; columns whose identifier
//! then starts with [`PLACEHOLDER_TOKEN`] are dropped.

use sheetdoc_core::{clean_name, CellValue, HeaderRows, NormalizedRow, NormalizedTable, RawTable};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::ParseError;

/// Prefix of identifiers synthesized for unresolvable blank headers
pub const PLACEHOLDER_TOKEN: &str = "unnamed";

/// Normalize the header block of `raw` and collect the data rows below it.
///
/// The source table is left untouched.
pub fn normalize_headers(
    raw: &RawTable,
    header_rows: HeaderRows,
) -> Result<NormalizedTable, ParseError> {
    for row in [header_rows.category, header_rows.sub_label] {
        if row >= raw.height() {
            return Err(ParseError::HeaderOutOfRange {
                row,
                height: raw.height(),
            });
        }
    }

    let width = raw.width();
    let categories = forward_fill(raw, header_rows.category, width, 0);
    let sub_labels = forward_fill(raw, header_rows.sub_label, width, 1);

    let mut kept = Vec::with_capacity(width);
    let mut columns = Vec::with_capacity(width);
    for (index, (category, sub_label)) in categories.iter().zip(&sub_labels).enumerate() {
        let id = format!("{}_{}", clean_name(category), clean_name(sub_label));
        if id.starts_with(PLACEHOLDER_TOKEN) {
            debug!(column = index, %id, "dropping placeholder column");
            continue;
        }
        kept.push(index);
        columns.push(id);
    }

    let mut seen = HashSet::new();
    for id in &columns {
        if !seen.insert(id.as_str()) {
            warn!(%id, "duplicate column identifier");
        }
    }

    let rows: Vec<NormalizedRow> = (header_rows.data_start()..raw.height())
        .filter_map(|source_row| {
            let cells: Vec<CellValue> = kept
                .iter()
                .map(|&column| raw.cell(source_row, column).trimmed())
                .collect();
            if cells.iter().all(CellValue::is_empty) {
                None
            } else {
                Some(NormalizedRow { source_row, cells })
            }
        })
        .collect();

    debug!(columns = columns.len(), rows = rows.len(), "headers normalized");
    Ok(NormalizedTable::new(columns, rows))
}

/// One header row with blank labels carried forward from the left
fn forward_fill(raw: &RawTable, row: usize, width: usize, level: usize) -> Vec<String> {
    let mut last: Option<String> = None;
    (0..width)
        .map(|column| {
            let cell = raw.cell(row, column);
            if !cell.is_blank() {
                last = Some(cell.to_string());
            }
            last.clone()
                .unwrap_or_else(|| format!("Unnamed: {column}_level_{level}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn strategic_sheet() -> RawTable {
        let e = CellValue::Empty;
        RawTable::new(vec![
            vec![text("Strategic activities")],
            vec![],
            vec![],
            vec![
                text("Name of the Division"),
                text("No. of Branches"),
                text("Community Outreach"),
                e.clone(),
                e.clone(),
            ],
            vec![
                e.clone(),
                e.clone(),
                text("No. Identified"),
                text("Completed upto 15.03.24"),
                text("%"),
            ],
            vec![
                text("  North Branch "),
                CellValue::Number(12.0),
                CellValue::Number(40.0),
                CellValue::Number(25.0),
                CellValue::Number(0.625),
            ],
            vec![e.clone(), e.clone(), e.clone(), e.clone(), e.clone()],
            vec![text("Totals"), CellValue::Number(12.0)],
        ])
    }

    #[test]
    fn identifiers_are_flattened() {
        let table = normalize_headers(&strategic_sheet(), HeaderRows::new(3, 4)).unwrap();
        assert_eq!(
            table.columns(),
            &[
                "name_of_the_division_unnamed_0_level_1".to_string(),
                "no_of_branches_unnamed_1_level_1".into(),
                "community_outreach_no_identified".into(),
                "community_outreach_completed_upto_150324".into(),
                "community_outreach_percentage".into(),
            ]
        );
    }

    #[test]
    fn empty_rows_are_dropped_and_text_trimmed() {
        let table = normalize_headers(&strategic_sheet(), HeaderRows::new(3, 4)).unwrap();
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].get(0), &text("North Branch"));
        assert_eq!(table.rows()[0].source_row, 5);
        assert_eq!(table.rows()[1].source_row, 7);
    }

    #[test]
    fn leading_blank_column_is_dropped() {
        let e = CellValue::Empty;
        let raw = RawTable::new(vec![
            vec![e.clone(), text("Unit"), text("Tree Planting")],
            vec![e.clone(), e.clone(), text("Budget")],
            vec![e.clone(), text("North"), CellValue::Number(10.0)],
        ]);

        let table = normalize_headers(&raw, HeaderRows::new(0, 1)).unwrap();
        assert_eq!(
            table.columns(),
            &["unit_unnamed_1_level_1".to_string(), "tree_planting_budget".into()]
        );
        assert_eq!(table.rows()[0].cells, vec![text("North"), CellValue::Number(10.0)]);
    }

    #[test]
    fn sub_labels_are_filled_independently() {
        let e = CellValue::Empty;
        let raw = RawTable::new(vec![
            vec![text("Unit"), text("A"), text("B")],
            vec![text("Name"), text("Budget"), e],
            vec![text("North"), CellValue::Number(1.0), CellValue::Number(2.0)],
        ]);

        let table = normalize_headers(&raw, HeaderRows::new(0, 1)).unwrap();
        assert_eq!(
            table.columns(),
            &["unit_name".to_string(), "a_budget".into(), "b_budget".into()]
        );
    }

    #[test]
    fn source_is_not_mutated() {
        let raw = strategic_sheet();
        let before = raw.clone();
        let _ = normalize_headers(&raw, HeaderRows::new(3, 4)).unwrap();
        assert_eq!(raw, before);
    }

    #[test]
    fn header_out_of_range() {
        let raw = RawTable::new(vec![vec![text("only row")]]);
        let err = normalize_headers(&raw, HeaderRows::new(3, 4)).unwrap_err();
        assert!(matches!(err, ParseError::HeaderOutOfRange { row: 3, height: 1 }));
    }
}
