//! Cell parsing. Malformed numbers never fail a row; they read as zero.

use adlens_core::date_window::DATE_FORMAT;
use chrono::{NaiveDate, NaiveDateTime};

const DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Normalize a date cell to `YYYY-MM-DD`. `None` for blank or unreadable
/// cells.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(raw, layout).ok())
        .or_else(|| {
            DATETIME_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
                .map(|dt| dt.date())
        })
        .map(|day| day.format(DATE_FORMAT).to_string())
}

/// Signed decimal with currency symbols, thousands separators and `%`
/// removed.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%') && !c.is_whitespace())
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Spend cannot be negative.
pub fn parse_spend(raw: &str) -> f64 {
    parse_amount(raw).max(0.0)
}

pub fn parse_count(raw: &str) -> u64 {
    let value = parse_amount(raw);
    if value <= 0.0 {
        return 0;
    }
    value.round() as u64
}
