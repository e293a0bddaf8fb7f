//! Variant configuration
//!
//! A variant describes one spreadsheet/template family. The two built-in
//! presets differ only in data, never in code:
//!
//! | Field | `strategic_activities` | `budget` |
//! |-------|------------------------|----------|
//! | Header rows | 3, 4 | 1, 2 |
//! | Target suffix | `_no_identified` | `_budget` |
//! | Completed suffix | `_completed_upto_<token>` | `_utilization` |
//! | Date source | completed column suffix | first header cell |
//! | Review line | `Re: Review of strategic activities as at ` | `Re: Review of CC budget as at ` |
//!
//! ## TOML overrides
//!
//! A config file starts from a preset (`preset = "budget"`, default
//! `strategic_activities`) and replaces any top-level field it names:
//!
//! ```toml
//! preset = "budget"
//! total_marker = "Grand Total"
//!
//! [header_rows]
//! category = 2
//! sub_label = 3
//! ```

use crate::{ConfigError, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Built-in variant presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    StrategicActivities,
    Budget,
}

impl Variant {
    pub fn config(self) -> VariantConfig {
        match self {
            Self::StrategicActivities => VariantConfig::strategic_activities(),
            Self::Budget => VariantConfig::budget(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrategicActivities => "strategic_activities",
            Self::Budget => "budget",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strategic" | "strategic_activities" => Ok(Self::StrategicActivities),
            "budget" => Ok(Self::Budget),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }
}

/// The two physical rows (0-indexed, absolute) that form the header block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRows {
    pub category: usize,
    pub sub_label: usize,
}

impl HeaderRows {
    pub const fn new(category: usize, sub_label: usize) -> Self {
        Self {
            category,
            sub_label,
        }
    }

    /// First row after the header block
    pub fn data_start(&self) -> usize {
        self.category.max(self.sub_label) + 1
    }
}

/// Column identifier filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatch {
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl ColumnMatch {
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::Prefix(p) => id.starts_with(p.as_str()),
            Self::Suffix(s) => id.ends_with(s.as_str()),
            Self::Contains(c) => id.contains(c.as_str()),
        }
    }
}

/// A trailing-suffix pattern and the role it denotes.
///
/// `pattern` is a regular expression; the text it matches is removed from
/// the identifier to obtain the base activity name, so it should be
/// anchored with `$`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixRule {
    pub pattern: String,
    pub role: Role,
}

impl SuffixRule {
    pub fn new(pattern: impl Into<String>, role: Role) -> Self {
        Self {
            pattern: pattern.into(),
            role,
        }
    }
}

/// Where the spreadsheet "as at" date comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSource {
    /// Token after the last `_` of the first completed column identifier
    CompletedColumn,
    /// Last space-separated token of a raw sheet cell, periods removed
    HeaderCell { row: usize, column: usize },
}

/// Literal markers searched for in template paragraphs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholders {
    /// Replaced by the unit name
    pub unit: String,
    /// Followed by the processing date
    pub date_label: String,
    /// Text preceding the resolved-date token on the review line
    pub review_prefix: String,
    /// Token replaced by the resolved date on the review line
    pub date_token: String,
}

impl Placeholders {
    fn with_review(review_prefix: &str) -> Self {
        Self {
            unit: "XXXXXXXXXXXXXX".into(),
            date_label: "Date:".into(),
            review_prefix: review_prefix.into(),
            date_token: "xxxxxxxx".into(),
        }
    }

    /// The full review-line marker, e.g. `Re: Review of ... as at xxxxxxxx`
    pub fn review_marker(&self) -> String {
        format!("{}{}", self.review_prefix, self.date_token)
    }
}

/// Positions within the results table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    /// Which body-level table is populated
    pub index: usize,
    /// Rows before this one are headers and never matched
    pub first_data_row: usize,
    pub label_column: usize,
    pub target_column: usize,
    pub completed_column: usize,
    pub percentage_column: usize,
}

impl TableLayout {
    /// Cells a populated row must have
    pub fn required_cells(&self) -> usize {
        [
            self.label_column,
            self.target_column,
            self.completed_column,
            self.percentage_column,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            index: 0,
            first_data_row: 1,
            label_column: 0,
            target_column: 1,
            completed_column: 2,
            percentage_column: 3,
        }
    }
}

/// How non-numeric target/completed cells are read
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Non-numeric text reads as 0
    #[default]
    Zero,
    /// Non-numeric text fails the whole generation
    Strict,
}

/// Complete description of one spreadsheet/template family
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    pub header_rows: HeaderRows,
    /// Normalized column holding the unit name
    pub unit_column: usize,
    /// Unit cell value marking a totals row
    pub total_marker: String,
    /// Identifiers that are never grouped
    pub exclude: Vec<ColumnMatch>,
    /// Suffix rules, tried in order
    pub suffixes: Vec<SuffixRule>,
    pub date_source: DateSource,
    pub placeholders: Placeholders,
    /// `chrono` format of the processing date written after the date label
    pub stamp_format: String,
    pub table: TableLayout,
    pub numeric_policy: NumericPolicy,
    /// Fail when a placeholder is missing from the template
    pub require_placeholders: bool,
}

impl VariantConfig {
    /// Strategic activities tracking sheet
    pub fn strategic_activities() -> Self {
        Self {
            name: Variant::StrategicActivities.to_string(),
            header_rows: HeaderRows::new(3, 4),
            unit_column: 0,
            total_marker: "Totals".into(),
            exclude: vec![
                ColumnMatch::Prefix("name_of_the_division".into()),
                ColumnMatch::Prefix("no_of_branches".into()),
                ColumnMatch::Contains("percentage".into()),
            ],
            suffixes: vec![
                SuffixRule::new(r"_(activity_)?no_identified$", Role::Target),
                SuffixRule::new(r"_(activity_)?completed_upto_[^_]+$", Role::Completed),
            ],
            date_source: DateSource::CompletedColumn,
            placeholders: Placeholders::with_review("Re: Review of strategic activities as at "),
            stamp_format: "%d-%m-%Y".into(),
            table: TableLayout::default(),
            numeric_policy: NumericPolicy::Zero,
            require_placeholders: true,
        }
    }

    /// Budget utilization sheet
    pub fn budget() -> Self {
        Self {
            name: Variant::Budget.to_string(),
            header_rows: HeaderRows::new(1, 2),
            exclude: vec![
                ColumnMatch::Suffix("_name_of_the_division".into()),
                ColumnMatch::Suffix("_name_of_the_divn".into()),
                ColumnMatch::Prefix("no_of_branches".into()),
                ColumnMatch::Contains("percentage".into()),
            ],
            suffixes: vec![
                SuffixRule::new(r"_budget$", Role::Target),
                SuffixRule::new(r"_utilization$", Role::Completed),
            ],
            date_source: DateSource::HeaderCell { row: 0, column: 0 },
            placeholders: Placeholders::with_review("Re: Review of CC budget as at "),
            ..Self::strategic_activities()
        }
    }

    /// True if the identifier is filtered out by an exclusion rule
    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|rule| rule.matches(id))
    }

    /// Parse a TOML config layered over its preset
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut overrides: toml::Table = toml::from_str(input)?;

        let preset = match overrides.remove("preset") {
            Some(toml::Value::String(name)) => name.parse::<Variant>()?,
            Some(other) => return Err(ConfigError::UnknownPreset(other.to_string())),
            None => Variant::default(),
        };

        let mut merged = match toml::Value::try_from(preset.config())? {
            toml::Value::Table(table) => table,
            _ => toml::Table::new(),
        };
        for (key, value) in overrides {
            merged.insert(key, value);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Render as a TOML document that [`VariantConfig::from_toml_str`] reads back
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self::strategic_activities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn presets_differ_in_data_only() {
        let strategic = VariantConfig::strategic_activities();
        let budget = VariantConfig::budget();

        assert_eq!(strategic.header_rows.data_start(), 5);
        assert_eq!(budget.header_rows.data_start(), 3);
        assert_eq!(budget.total_marker, strategic.total_marker);
        assert_eq!(
            budget.placeholders.review_marker(),
            "Re: Review of CC budget as at xxxxxxxx"
        );
    }

    #[test]
    fn strategic_exclusions() {
        let config = VariantConfig::strategic_activities();
        assert!(config.is_excluded("name_of_the_division_unnamed_0_level_1"));
        assert!(config.is_excluded("no_of_branches_unnamed_1_level_1"));
        assert!(config.is_excluded("tree_planting_percentage"));
        assert!(!config.is_excluded("tree_planting_no_identified"));
    }

    #[test]
    fn budget_exclusions() {
        let config = VariantConfig::budget();
        assert!(config.is_excluded("sl_no_name_of_the_divn"));
        assert!(config.is_excluded("unit_name_of_the_division"));
        assert!(!config.is_excluded("name_of_the_division_x_budget"));
    }

    #[test]
    fn variant_from_str() {
        assert_eq!("budget".parse::<Variant>().unwrap(), Variant::Budget);
        assert_eq!(
            "Strategic-Activities".parse::<Variant>().unwrap(),
            Variant::StrategicActivities
        );
        assert!("annual".parse::<Variant>().is_err());
    }

    #[test]
    fn table_layout_required_cells() {
        assert_eq!(TableLayout::default().required_cells(), 4);
    }

    #[test]
    fn toml_overrides_preset() {
        let config = VariantConfig::from_toml_str(
            r#"
preset = "budget"
total_marker = "Grand Total"
numeric_policy = "strict"

[header_rows]
category = 2
sub_label = 3
"#,
        )
        .unwrap();

        assert_eq!(config.name, "budget");
        assert_eq!(config.total_marker, "Grand Total");
        assert_eq!(config.numeric_policy, NumericPolicy::Strict);
        assert_eq!(config.header_rows, HeaderRows::new(2, 3));
        assert_eq!(config.suffixes, VariantConfig::budget().suffixes);
    }

    #[test]
    fn toml_without_preset_is_strategic() {
        let config = VariantConfig::from_toml_str("stamp_format = \"%d.%m.%Y\"").unwrap();
        assert_eq!(config.name, "strategic_activities");
        assert_eq!(config.stamp_format, "%d.%m.%Y");
    }

    #[test]
    fn toml_tagged_fields() {
        let config = VariantConfig::from_toml_str(
            r#"
exclude = [{ prefix = "sl_no" }, { contains = "percentage" }]
date_source = { kind = "header_cell", row = 1, column = 2 }

[[suffixes]]
pattern = "_plan$"
role = "target"
"#,
        )
        .unwrap();

        assert_eq!(
            config.exclude,
            vec![
                ColumnMatch::Prefix("sl_no".into()),
                ColumnMatch::Contains("percentage".into())
            ]
        );
        assert_eq!(config.date_source, DateSource::HeaderCell { row: 1, column: 2 });
        assert_eq!(config.suffixes, vec![SuffixRule::new("_plan$", Role::Target)]);
    }

    #[test]
    fn budget_preset_survives_toml() {
        let budget = VariantConfig::budget();
        let text = budget.to_toml_string().unwrap();
        assert_eq!(VariantConfig::from_toml_str(&text).unwrap(), budget);
    }

    #[test]
    fn toml_unknown_preset() {
        let err = VariantConfig::from_toml_str("preset = \"annual\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset(name) if name == "annual"));
    }
}
