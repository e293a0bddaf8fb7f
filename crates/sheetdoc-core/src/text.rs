//! Text normalization and number formatting shared across the pipeline.

use rust_decimal::{Decimal, RoundingStrategy};

/// Flatten a header label or table label into an identifier.
///
/// Trims, lowercases, spells out `%` as `percentage`, drops every character
/// that is neither a word character nor whitespace, and turns each whitespace
/// run into a single underscore.
///
/// ```rust
/// use sheetdoc_core::clean_name;
///
/// assert_eq!(clean_name("  No. of Branches "), "no_of_branches");
/// assert_eq!(clean_name("Achieved %"), "achieved_percentage");
/// ```
pub fn clean_name(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('%', "percentage");

    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
        } else if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Turn an activity identifier into a row label.
///
/// Underscores become spaces; a letter is upper-cased when the preceding
/// character is not a letter and lower-cased otherwise.
///
/// ```rust
/// use sheetdoc_core::title_case;
///
/// assert_eq!(title_case("community_outreach"), "Community Outreach");
/// assert_eq!(title_case("covid19_drive"), "Covid19 Drive");
/// ```
pub fn title_case(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut prev_alpha = false;
    for ch in identifier.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Render a cell number: whole values without a fraction, others in their
/// shortest round-trip form.
pub fn display_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Completion percentage of `completed` against `target`.
///
/// Rounded half-to-even to two places with a trailing `%`; whole results keep
/// one decimal place (`100.0%`). A zero or non-finite target yields `0%`.
///
/// ```rust
/// use sheetdoc_core::completion_percentage;
///
/// assert_eq!(completion_percentage(40.0, 25.0), "62.5%");
/// assert_eq!(completion_percentage(0.0, 25.0), "0%");
/// ```
pub fn completion_percentage(target: f64, completed: f64) -> String {
    if target == 0.0 || !target.is_finite() {
        return "0%".to_string();
    }

    let ratio = completed / target * 100.0;
    let Some(exact) = Decimal::from_f64_retain(ratio) else {
        return "0%".to_string();
    };

    let rounded = exact
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        .normalize();
    if rounded.scale() == 0 {
        format!("{}.0%", rounded)
    } else {
        format!("{}%", rounded)
    }
}
