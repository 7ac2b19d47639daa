use std::collections::HashMap;
use std::hash::Hash;

use adlens_core::model::{Report, ReportRows, ReportSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::IngestError;
use crate::reader::{RawRow, RawTable};
use crate::source::SourceLayout;

/// What happened to the rows of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizeSummary {
    pub rows_read: usize,
    /// Rejected for a blank or unreadable date or a blank ad id.
    pub rows_dropped: usize,
    /// Folded into an earlier row with the same natural key.
    pub rows_merged: usize,
    pub rows_kept: usize,
}

pub fn normalize(
    source: ReportSource,
    filename: &str,
    text: &str,
) -> Result<Report, IngestError> {
    normalize_at(source, filename, text, Utc::now()).map(|(report, _)| report)
}

/// Parse, map and dedup `text` as an export of `source`. Nothing is ingested
/// when a required header is missing.
pub fn normalize_at(
    source: ReportSource,
    filename: &str,
    text: &str,
    uploaded_at: DateTime<Utc>,
) -> Result<(Report, NormalizeSummary), IngestError> {
    let table = RawTable::parse(text)?;
    let layout = SourceLayout::of(source);

    let missing = table.missing(&layout.required_headers());
    if !missing.is_empty() {
        warn!(source = %source, filename, missing = ?missing, "report rejected: missing headers");
        return Err(IngestError::MissingHeaders {
            report_source: source,
            missing,
        });
    }

    let rows_read = table.len();
    let (rows, summary) = match layout {
        SourceLayout::Buyside(headers) => {
            let mapped = map_rows(&table, |row| headers.map(row));
            let rows_dropped = rows_read - mapped.len();
            let (rows, rows_merged) = dedup(
                mapped,
                |row| {
                    let (date, ad, adset, campaign) = row.natural_key();
                    (
                        date.to_string(),
                        ad.to_string(),
                        adset.to_string(),
                        campaign.to_string(),
                    )
                },
                |kept, dup| kept.absorb(dup),
            );
            let summary = NormalizeSummary {
                rows_read,
                rows_dropped,
                rows_merged,
                rows_kept: rows.len(),
            };
            (ReportRows::Buyside(rows), summary)
        }
        SourceLayout::Sellside(headers) => {
            let mapped = map_rows(&table, |row| headers.map(row));
            let rows_dropped = rows_read - mapped.len();
            let (rows, rows_merged) = dedup(
                mapped,
                |row| {
                    let (date, ad) = row.natural_key();
                    (date.to_string(), ad.to_string())
                },
                |kept, dup| kept.absorb(dup),
            );
            let summary = NormalizeSummary {
                rows_read,
                rows_dropped,
                rows_merged,
                rows_kept: rows.len(),
            };
            (ReportRows::Sellside(rows), summary)
        }
    };

    let id = content_id(&rows)?;
    info!(
        source = %source,
        filename,
        report_id = %id,
        rows_read = summary.rows_read,
        rows_dropped = summary.rows_dropped,
        rows_merged = summary.rows_merged,
        rows_kept = summary.rows_kept,
        "report normalized"
    );

    let report = Report {
        id,
        source,
        filename: filename.to_string(),
        uploaded_at,
        rows,
    };
    Ok((report, summary))
}

fn map_rows<T>(table: &RawTable, map: impl Fn(&RawRow<'_>) -> Option<T>) -> Vec<T> {
    table.rows().filter_map(|row| map(&row)).collect()
}

/// Collapse rows sharing a key, keeping first-appearance order. Returns the
/// surviving rows and how many were merged away.
fn dedup<T, K: Hash + Eq>(
    rows: Vec<T>,
    key: impl Fn(&T) -> K,
    absorb: impl Fn(&mut T, &T),
) -> (Vec<T>, usize) {
    let mut kept: Vec<T> = Vec::with_capacity(rows.len());
    let mut index: HashMap<K, usize> = HashMap::with_capacity(rows.len());
    let mut merged = 0;
    for row in rows {
        match index.get(&key(&row)) {
            Some(&slot) => {
                absorb(&mut kept[slot], &row);
                merged += 1;
            }
            None => {
                index.insert(key(&row), kept.len());
                kept.push(row);
            }
        }
    }
    (kept, merged)
}

/// Lowercase hex SHA-256 of the rows' JSON form.
fn content_id(rows: &ReportRows) -> Result<String, IngestError> {
    let canonical = serde_json::to_vec(rows)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
