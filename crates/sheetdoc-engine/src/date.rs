//! "As at" date resolution
//!
//! The date a spreadsheet reports on is encoded either in the identifier of
//! a completed column (`..._completed_upto_150324`) or in a title cell
//! (`CC budget utilization as at 15.03.2024`). Resolution never fails; a
//! token that is not a valid date yields [`ResolvedDate::Unknown`].

use chrono::NaiveDate;
use sheetdoc_core::{ActivityGroups, DateSource, RawTable, ResolvedDate};
use tracing::{debug, warn};

/// Parse a `DDMMYY` or `DDMMYYYY` token
pub fn parse_date_token(token: &str) -> ResolvedDate {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return ResolvedDate::Unknown;
    }

    let (input, output) = match token.len() {
        6 => ("%d%m%y", "%d-%m-%y"),
        8 => ("%d%m%Y", "%d-%m-%Y"),
        _ => return ResolvedDate::Unknown,
    };

    match NaiveDate::parse_from_str(token, input) {
        Ok(date) => ResolvedDate::Parsed {
            date,
            text: date.format(output).to_string(),
        },
        Err(_) => ResolvedDate::Unknown,
    }
}

/// The raw date token for a spreadsheet, before parsing
pub fn date_token(groups: &ActivityGroups, raw: &RawTable, source: &DateSource) -> Option<String> {
    match source {
        DateSource::CompletedColumn => groups
            .first_completed()
            .and_then(|column| column.id.rsplit('_').next())
            .map(str::to_string),
        DateSource::HeaderCell { row, column } => raw
            .cell(*row, *column)
            .to_string()
            .split_whitespace()
            .last()
            .map(|token| token.replace('.', "")),
    }
}

/// Resolve the "as at" date of a spreadsheet
pub fn resolve_date(groups: &ActivityGroups, raw: &RawTable, source: &DateSource) -> ResolvedDate {
    let Some(token) = date_token(groups, raw, source) else {
        warn!(?source, "no date token found");
        return ResolvedDate::Unknown;
    };

    let resolved = parse_date_token(&token);
    if resolved.is_known() {
        debug!(%token, date = %resolved, "date resolved");
    } else {
        warn!(%token, "date token is not a valid date");
    }
    resolved
}
