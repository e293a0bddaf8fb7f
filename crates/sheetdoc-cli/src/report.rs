//! `sheetdoc inspect` output

use serde::Serialize;
use sheetdoc_core::ActivityGroup;
use sheetdoc_engine::Prepared;
use std::fmt::Write;

/// What the engine sees in a spreadsheet
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub variant: String,
    pub resolved_date: String,
    pub columns: Vec<String>,
    pub activities: Vec<ActivityGroup>,
    pub units: Vec<String>,
}

impl InspectReport {
    pub fn new(variant: &str, prepared: &Prepared) -> Self {
        Self {
            variant: variant.to_string(),
            resolved_date: prepared.resolved_date.to_string(),
            columns: prepared.table.columns().to_vec(),
            activities: prepared.groups.iter().cloned().collect(),
            units: prepared.jobs.iter().map(|job| job.unit.clone()).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "Variant: {}", self.variant)?;
        writeln!(out, "Date:    {}", self.resolved_date)?;

        writeln!(out, "\nColumns ({}):", self.columns.len())?;
        for (i, column) in self.columns.iter().enumerate() {
            writeln!(out, "  [{i}] {column}")?;
        }

        writeln!(out, "\nActivities ({}):", self.activities.len())?;
        for group in &self.activities {
            let side = |column: Option<&sheetdoc_core::ColumnRef>| {
                column.map_or_else(|| "-".to_string(), |c| c.id.clone())
            };
            writeln!(
                out,
                "  {}\n    target:    {}\n    completed: {}",
                group.name,
                side(group.target.as_ref()),
                side(group.completed.as_ref())
            )?;
        }

        writeln!(out, "\nUnits ({}): {}", self.units.len(), self.units.join(", "))?;
        Ok(out)
    }
}
