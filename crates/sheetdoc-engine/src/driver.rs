//! Generation driver
//!
//! Runs the pipeline once per spreadsheet: normalize the header block, drop
//! total rows, group activities, resolve the date, then build one document
//! per remaining row through a [`DocumentBuilder`].

use chrono::NaiveDate;
use rayon::prelude::*;
use sheetdoc_core::{
    ActivityGroups, ActivityMeasure, CellValue, ColumnRef, DocumentBuilder, DocumentJob,
    GeneratedBatch, GeneratedDocument, GenerationContext, NormalizedRow, NormalizedTable,
    NumericPolicy, RawTable, ResolvedDate, VariantConfig,
};
use sheetdoc_parser::normalize_headers;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::date::resolve_date;
use crate::grouping::ActivityGrouper;
use crate::EngineError;

/// Everything derived from a spreadsheet before any document is built
#[derive(Clone, Debug, PartialEq)]
pub struct Prepared {
    /// Normalized table with total rows removed
    pub table: NormalizedTable,
    pub groups: ActivityGroups,
    pub resolved_date: ResolvedDate,
    /// One job per unit, in row order
    pub jobs: Vec<DocumentJob>,
}

/// Run every spreadsheet stage up to, but not including, document building
pub fn prepare(raw: &RawTable, config: &VariantConfig) -> Result<Prepared, EngineError> {
    let grouper = ActivityGrouper::new(config)?;

    let table = normalize_headers(raw, config.header_rows)?
        .without_marker_rows(config.unit_column, &config.total_marker);
    let groups = grouper.group(table.columns());
    let resolved_date = resolve_date(&groups, raw, &config.date_source);
    let jobs = build_jobs(&table, &groups, config)?;

    Ok(Prepared {
        table,
        groups,
        resolved_date,
        jobs,
    })
}

fn build_jobs(
    table: &NormalizedTable,
    groups: &ActivityGroups,
    config: &VariantConfig,
) -> Result<Vec<DocumentJob>, EngineError> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::with_capacity(table.rows().len());

    for row in table.rows() {
        let unit = row.get(config.unit_column).to_string().trim().to_string();
        if unit.is_empty() {
            return Err(EngineError::MissingUnitName {
                row: row.source_row + 1,
            });
        }
        if !seen.insert(unit.clone()) {
            return Err(EngineError::DuplicateUnit(unit));
        }

        let measures = groups
            .iter()
            .map(|group| {
                let target = read_value(row, group.target.as_ref(), config.numeric_policy, &unit)?;
                let completed =
                    read_value(row, group.completed.as_ref(), config.numeric_policy, &unit)?;
                Ok(ActivityMeasure::new(group.name.as_str(), target, completed))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        jobs.push(DocumentJob { unit, measures });
    }

    Ok(jobs)
}

/// Numeric value of one side of an activity; an absent column reads as 0
fn read_value(
    row: &NormalizedRow,
    column: Option<&ColumnRef>,
    policy: NumericPolicy,
    unit: &str,
) -> Result<f64, EngineError> {
    let Some(column) = column else {
        return Ok(0.0);
    };

    let value = match row.get(column.index) {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) if s.trim().is_empty() => 0.0,
        CellValue::Empty => 0.0,
        other => {
            let text = other.to_string();
            match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => match policy {
                    NumericPolicy::Zero => {
                        warn!(%unit, column = %column.id, value = %text, "non-numeric value read as 0");
                        0.0
                    }
                    NumericPolicy::Strict => {
                        return Err(EngineError::NonNumeric {
                            unit: unit.to_string(),
                            column: column.id.clone(),
                            value: text,
                        })
                    }
                },
            }
        }
    };
    Ok(value)
}

/// Generates one document per unit row with a [`DocumentBuilder`]
pub struct Driver<B> {
    config: VariantConfig,
    builder: B,
    parallel: bool,
}

impl<B: DocumentBuilder> Driver<B> {
    pub fn new(config: VariantConfig, builder: B) -> Self {
        Self {
            config,
            builder,
            parallel: false,
        }
    }

    /// Build documents on the rayon thread pool; output order is unchanged
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Generate every document of a loaded spreadsheet
    pub fn run(
        &self,
        raw: &RawTable,
        processing_date: NaiveDate,
    ) -> Result<GeneratedBatch<B::Output>, EngineError> {
        let prepared = prepare(raw, &self.config)?;
        info!(
            variant = %self.config.name,
            units = prepared.jobs.len(),
            activities = prepared.groups.len(),
            date = %prepared.resolved_date,
            parallel = self.parallel,
            "generating documents"
        );

        let ctx = GenerationContext {
            resolved_date: prepared.resolved_date,
            processing_date,
        };
        let build = |job: &DocumentJob| {
            debug!(unit = %job.unit, "building document");
            self.builder
                .build(job, &ctx)
                .map(|document| GeneratedDocument {
                    unit: job.unit.clone(),
                    document,
                })
                .map_err(|source| EngineError::Document {
                    unit: job.unit.clone(),
                    source,
                })
        };

        let documents = if self.parallel {
            prepared
                .jobs
                .par_iter()
                .map(build)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            prepared
                .jobs
                .iter()
                .map(build)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(GeneratedBatch::new(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetdoc_core::{RenderError, TemplateError};

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    /// Budget layout: title in A1, header rows 1-2, data from row 3
    fn budget_sheet(rows: Vec<Vec<CellValue>>) -> RawTable {
        let mut all = vec![
            vec![text("CC budget utilization as at 15.03.2024")],
            vec![text("Sl No"), text("Roads"), CellValue::Empty],
            vec![text("Name of the Divn"), text("Budget"), text("Utilization")],
        ];
        all.extend(rows);
        RawTable::new(all)
    }

    /// Echoes the job so tests can see what the builder received
    struct Recorder;

    impl DocumentBuilder for Recorder {
        type Output = (DocumentJob, String);

        fn build(
            &self,
            job: &DocumentJob,
            ctx: &GenerationContext,
        ) -> Result<Self::Output, RenderError> {
            Ok((job.clone(), ctx.resolved_date.to_string()))
        }
    }

    struct Failing;

    impl DocumentBuilder for Failing {
        type Output = ();

        fn build(&self, _job: &DocumentJob, _ctx: &GenerationContext) -> Result<(), RenderError> {
            Err(TemplateError::MissingTable(0).into())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    #[test]
    fn prepare_builds_jobs_in_row_order() {
        let raw = budget_sheet(vec![
            vec![text("Kandy"), num(1000.0), num(250.0)],
            vec![text("Galle"), num(400.0), CellValue::Empty],
            vec![text("Totals"), num(1400.0), num(250.0)],
        ]);
        let prepared = prepare(&raw, &VariantConfig::budget()).unwrap();

        assert_eq!(prepared.resolved_date.to_string(), "15-03-2024");
        assert_eq!(
            prepared.jobs,
            vec![
                DocumentJob {
                    unit: "Kandy".into(),
                    measures: vec![ActivityMeasure::new("roads", 1000.0, 250.0)],
                },
                DocumentJob {
                    unit: "Galle".into(),
                    measures: vec![ActivityMeasure::new("roads", 400.0, 0.0)],
                },
            ]
        );
    }

    #[test]
    fn non_numeric_text_reads_as_zero_by_default() {
        let raw = budget_sheet(vec![vec![text("Kandy"), text("n/a"), text(" 12.5 ")]]);
        let prepared = prepare(&raw, &VariantConfig::budget()).unwrap();

        assert_eq!(
            prepared.jobs[0].measures,
            vec![ActivityMeasure::new("roads", 0.0, 12.5)]
        );
    }

    #[test]
    fn strict_policy_rejects_non_numeric_text() {
        let mut config = VariantConfig::budget();
        config.numeric_policy = NumericPolicy::Strict;
        let raw = budget_sheet(vec![vec![text("Kandy"), text("n/a"), CellValue::Empty]]);

        match prepare(&raw, &config) {
            Err(EngineError::NonNumeric {
                unit,
                column,
                value,
            }) => {
                assert_eq!(unit, "Kandy");
                assert_eq!(column, "roads_budget");
                assert_eq!(value, "n/a");
            }
            other => panic!("expected NonNumeric, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_duplicate_units_are_rejected() {
        let blank = budget_sheet(vec![vec![text("  "), num(1.0), num(1.0)]]);
        assert!(matches!(
            prepare(&blank, &VariantConfig::budget()),
            Err(EngineError::MissingUnitName { row: 4 })
        ));

        let duplicate = budget_sheet(vec![
            vec![text("Kandy"), num(1.0), num(1.0)],
            vec![text("Kandy"), num(2.0), num(2.0)],
        ]);
        assert!(matches!(
            prepare(&duplicate, &VariantConfig::budget()),
            Err(EngineError::DuplicateUnit(unit)) if unit == "Kandy"
        ));
    }

    #[test]
    fn parallel_run_keeps_row_order() {
        let rows = (0_u32..32)
            .map(|i| vec![text(&format!("Unit {i:02}")), num(f64::from(i)), num(1.0)])
            .collect();
        let raw = budget_sheet(rows);

        let sequential = Driver::new(VariantConfig::budget(), Recorder)
            .run(&raw, today())
            .unwrap();
        let parallel = Driver::new(VariantConfig::budget(), Recorder)
            .parallel(true)
            .run(&raw, today())
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 32);
        assert_eq!(parallel.units().next(), Some("Unit 00"));
        assert_eq!(parallel.get("Unit 31").unwrap().1, "15-03-2024");
    }

    #[test]
    fn builder_failure_names_the_unit() {
        let raw = budget_sheet(vec![vec![text("Kandy"), num(1.0), num(1.0)]]);
        let result = Driver::new(VariantConfig::budget(), Failing).run(&raw, today());

        match result {
            Err(EngineError::Document { unit, .. }) => assert_eq!(unit, "Kandy"),
            other => panic!("expected document error, got {other:?}"),
        }
    }
}
