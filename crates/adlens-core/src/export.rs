use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::RollupRecord;

/// Column order of an export, matching the field order of [`RollupRecord`].
pub const EXPORT_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "spend",
    "clicks",
    "impressions",
    "revenue",
    "ad_clicks",
    "views",
    "margin",
    "roi",
    "cpac",
    "rpac",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    #[default]
    Csv,
    Tsv,
}

impl Delimiter {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") | Some("csv") => Ok(Delimiter::Csv),
            Some("tsv") => Ok(Delimiter::Tsv),
            Some(other) => Err(CoreError::UnknownVariant {
                kind: "export format",
                value: other.to_string(),
            }),
        }
    }

    fn byte(self) -> u8 {
        match self {
            Delimiter::Csv => b',',
            Delimiter::Tsv => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Delimiter::Csv => "csv",
            Delimiter::Tsv => "tsv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Delimiter::Csv => "text/csv; charset=utf-8",
            Delimiter::Tsv => "text/tab-separated-values; charset=utf-8",
        }
    }
}

/// Sanitize a text field against formula injection.
///
/// Spreadsheet apps interpret values that begin with `=`, `+`, `-`, `@`, TAB,
/// or CR as formula expressions. Prepending a single quote makes them literal.
fn sanitize_field(val: &str) -> Cow<'_, str> {
    if val.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        Cow::Owned(format!("'{val}"))
    } else {
        Cow::Borrowed(val)
    }
}

/// Serialize already filtered and sorted records. An empty input produces a
/// single empty line.
pub fn export(records: &[RollupRecord], delimiter: Delimiter) -> Result<String, CoreError> {
    if records.is_empty() {
        return Ok("\n".to_string());
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter.byte())
        .from_writer(Vec::with_capacity(records.len().saturating_mul(128)));

    wtr.write_record(EXPORT_COLUMNS)
        .map_err(|e| CoreError::Export(format!("write_record failed: {e}")))?;

    for record in records {
        let fields = [
            sanitize_field(&record.id).into_owned(),
            sanitize_field(&record.name).into_owned(),
            record.spend.to_string(),
            record.clicks.to_string(),
            record.impressions.to_string(),
            record.revenue.to_string(),
            record.ad_clicks.to_string(),
            record.views.to_string(),
            record.margin.to_string(),
            record.roi.to_string(),
            record.cpac.to_string(),
            record.rpac.to_string(),
        ];
        wtr.write_record(&fields)
            .map_err(|e| CoreError::Export(format!("write_record failed: {e}")))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| CoreError::Export(format!("flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::BaseMetrics;

    fn record(id: &str, name: &str, spend: f64, revenue: f64) -> RollupRecord {
        RollupRecord::new(
            id,
            name,
            BaseMetrics {
                spend,
                revenue,
                ad_clicks: 4,
                ..BaseMetrics::default()
            },
            BTreeSet::from(["child".to_string()]),
        )
    }

    #[test]
    fn empty_export_is_a_single_empty_line() {
        assert_eq!(export(&[], Delimiter::Csv).expect("export"), "\n");
    }

    #[test]
    fn header_follows_record_field_order() {
        let out = export(&[record("c1", "Spring", 10.0, 15.0)], Delimiter::Csv).expect("export");
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,spend,clicks,impressions,revenue,ad_clicks,views,margin,roi,cpac,rpac")
        );
        assert_eq!(lines.next(), Some("c1,Spring,10,0,0,15,4,0,5,0.5,2.5,3.75"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn tsv_uses_tabs_and_quotes_only_when_needed() {
        let out = export(&[record("c1", "a, b", 1.0, 1.0)], Delimiter::Tsv).expect("export");
        let row = out.lines().nth(1).expect("row");
        assert!(row.starts_with("c1\ta, b\t1\t"));
    }

    #[test]
    fn formula_like_names_are_neutralized() {
        let out = export(&[record("c1", "=HYPERLINK()", 1.0, 1.0)], Delimiter::Csv).expect("export");
        assert!(out.contains("'=HYPERLINK()"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Delimiter::parse(Some("xlsx")).is_err());
        assert_eq!(Delimiter::parse(None).expect("default"), Delimiter::Csv);
    }
}
