//! Template population
//!
//! Every document starts from a fresh parse of the template bytes:
//!
//! 1. Paragraph placeholders are replaced (unit name, processing date,
//!    resolved "as at" date). A changed paragraph is rewritten as one plain
//!    run, so run-level formatting inside it is lost.
//! 2. The results table is matched by normalized first-cell label. Matched
//!    rows get target, completed and percentage overwritten; unmatched
//!    activities are appended in grouping order; template rows without data
//!    keep their content.
//! 3. Every table cell reading `X` (trimmed, any case) becomes `0`.

use chrono::NaiveDate;
use sheetdoc_core::{
    clean_name, ActivityMeasure, DocumentBuilder, DocumentJob, GenerationContext, Placeholders,
    RenderError, TableLayout, TemplateError, VariantConfig,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace};

use crate::document::{self, add_row, cell_text, paragraph_text, set_cell_text, DocxDocument};

/// A read-only docx template plus the settings that drive population
#[derive(Clone, Debug)]
pub struct DocxTemplate {
    bytes: Vec<u8>,
    placeholders: Placeholders,
    stamp_format: String,
    table: TableLayout,
    require_placeholders: bool,
}

impl DocxTemplate {
    /// Load a template file
    pub fn open(path: &Path, config: &VariantConfig) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, config)
    }

    /// Use in-memory template bytes; the package is validated once up front
    pub fn from_bytes(bytes: Vec<u8>, config: &VariantConfig) -> Result<Self, RenderError> {
        DocxDocument::from_bytes(&bytes)?;
        Ok(Self {
            bytes,
            placeholders: config.placeholders.clone(),
            stamp_format: config.stamp_format.clone(),
            table: config.table,
            require_placeholders: config.require_placeholders,
        })
    }

    /// Populate a fresh copy of the template for one unit
    pub fn populate(
        &self,
        job: &DocumentJob,
        ctx: &GenerationContext,
    ) -> Result<DocxDocument, RenderError> {
        let mut doc = DocxDocument::from_bytes(&self.bytes)?;
        self.substitute_paragraphs(&mut doc, &job.unit, ctx)?;
        self.fill_table(&mut doc, &job.measures)?;
        zero_placeholder_cells(&mut doc);
        Ok(doc)
    }

    fn substitute_paragraphs(
        &self,
        doc: &mut DocxDocument,
        unit: &str,
        ctx: &GenerationContext,
    ) -> Result<(), RenderError> {
        let p = &self.placeholders;
        let stamp = format_stamp(ctx.processing_date, &self.stamp_format);
        let dated_label = format!("{} {}", p.date_label, stamp);
        let review_marker = p.review_marker();
        let review_line = format!("{}{}", p.review_prefix, ctx.resolved_date);

        let mut seen = [false; 3];
        for paragraph in doc.paragraphs_mut() {
            let original = paragraph_text(paragraph);
            let mut text = original.clone();

            if text.contains(&p.unit) {
                text = text.replace(&p.unit, unit);
                seen[0] = true;
            }
            if text.contains(&p.date_label) {
                text = text.replace(&p.date_label, &dated_label);
                seen[1] = true;
            }
            if text.contains(&review_marker) {
                text = text.replace(&review_marker, &review_line);
                seen[2] = true;
            }

            if text != original {
                trace!(from = %original, to = %text, "paragraph substituted");
                document::set_paragraph_text(paragraph, &text);
            }
        }

        if self.require_placeholders {
            let markers = [&p.unit, &p.date_label, &review_marker];
            if let Some((marker, _)) = markers.iter().zip(seen).find(|(_, found)| !found) {
                return Err(TemplateError::MissingPlaceholder((*marker).clone()).into());
            }
        }
        Ok(())
    }

    fn fill_table(
        &self,
        doc: &mut DocxDocument,
        measures: &[ActivityMeasure],
    ) -> Result<(), RenderError> {
        let layout = self.table;
        let required = layout.required_cells();
        let table = doc
            .tables_mut()
            .nth(layout.index)
            .ok_or(TemplateError::MissingTable(layout.index))?;

        let existing: HashMap<String, usize> = document::rows(table)
            .enumerate()
            .skip(layout.first_data_row)
            .filter_map(|(i, tr)| {
                document::cells(tr)
                    .nth(layout.label_column)
                    .map(|tc| (clean_name(cell_text(tc).trim()), i))
            })
            .collect();

        for measure in measures {
            let [target, completed, percentage] = measure.cells();
            let matched = existing.get(&measure.name).copied();

            let (row_index, row) = match matched {
                Some(i) => {
                    debug!(activity = %measure.name, row = i, "updating template row");
                    let row = table
                        .children_named_mut(document::W_TR)
                        .nth(i)
                        .ok_or(TemplateError::MissingTable(layout.index))?;
                    (i, row)
                }
                None => {
                    debug!(activity = %measure.name, "appending row");
                    let i = document::rows(table).count();
                    (i, add_row(table))
                }
            };

            let cell_count = row.children_named(document::W_TC).count();
            if cell_count < required {
                return Err(TemplateError::RowTooShort {
                    row: row_index,
                    cells: cell_count,
                    required,
                }
                .into());
            }

            let label = matched.is_none().then(|| measure.label());
            for (column, cell) in row.children_named_mut(document::W_TC).enumerate() {
                let text = if column == layout.target_column {
                    Some(target.as_str())
                } else if column == layout.completed_column {
                    Some(completed.as_str())
                } else if column == layout.percentage_column {
                    Some(percentage.as_str())
                } else if column == layout.label_column {
                    label.as_deref()
                } else {
                    None
                };
                if let Some(text) = text {
                    set_cell_text(cell, text);
                }
            }
        }

        Ok(())
    }
}

/// Replace every cell reading `X` in any body-level table with `0`
fn zero_placeholder_cells(doc: &mut DocxDocument) {
    for table in doc.tables_mut() {
        for row in table.children_named_mut(document::W_TR) {
            for cell in row.children_named_mut(document::W_TC) {
                if cell_text(cell).trim().eq_ignore_ascii_case("x") {
                    set_cell_text(cell, "0");
                }
            }
        }
    }
}

fn format_stamp(date: NaiveDate, format: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    match write!(out, "{}", date.format(format)) {
        Ok(()) => out,
        // Invalid format strings fall back to the default stamp
        Err(_) => date.format("%d-%m-%Y").to_string(),
    }
}

impl DocumentBuilder for DocxTemplate {
    type Output = Vec<u8>;

    fn build(&self, job: &DocumentJob, ctx: &GenerationContext) -> Result<Vec<u8>, RenderError> {
        self.populate(job, ctx)?.to_bytes()
    }
}
