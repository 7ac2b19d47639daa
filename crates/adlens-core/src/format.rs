//! Display formatting for metric values.

use serde::Serialize;

use crate::model::{Column, ColumnKind, RollupRecord, Totals};

/// Render `value` the way the dashboard shows `column`.
///
/// Currency columns: `$` plus two decimals, no digit grouping, sign in
/// front of the `$` (`-$12.35`). `roi`: percentage with two decimals
/// (`0.5` → `50.00%`). Everything else: plain decimal.
pub fn format_metric(column: Column, value: f64) -> String {
    match column.kind() {
        ColumnKind::Currency => {
            let (negative, cents) = round_half_up_cents(value);
            format!(
                "{}${}.{:02}",
                if negative { "-" } else { "" },
                cents / 100,
                cents % 100
            )
        }
        ColumnKind::Percent => {
            let (negative, hundredths) = round_half_up_cents(value * 100.0);
            format!(
                "{}{}.{:02}%",
                if negative { "-" } else { "" },
                hundredths / 100,
                hundredths % 100
            )
        }
        ColumnKind::Count | ColumnKind::Text => value.to_string(),
    }
}

/// `|value|` in hundredths, rounded half away from zero, and whether the
/// rounded value is negative. Rounding to zero never reports a sign.
fn round_half_up_cents(value: f64) -> (bool, u64) {
    if !value.is_finite() {
        return (false, 0);
    }
    let scaled = (value.abs() * 100.0).round();
    let cents = scaled as u64;
    (value < 0.0 && cents > 0, cents)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedMetrics {
    pub spend: String,
    pub clicks: String,
    pub impressions: String,
    pub revenue: String,
    pub ad_clicks: String,
    pub views: String,
    pub margin: String,
    pub roi: String,
    pub cpac: String,
    pub rpac: String,
}

pub fn format_record(record: &RollupRecord) -> FormattedMetrics {
    FormattedMetrics {
        spend: format_metric(Column::Spend, record.spend),
        clicks: format_metric(Column::Clicks, record.clicks as f64),
        impressions: format_metric(Column::Impressions, record.impressions as f64),
        revenue: format_metric(Column::Revenue, record.revenue),
        ad_clicks: format_metric(Column::AdClicks, record.ad_clicks as f64),
        views: format_metric(Column::Views, record.views as f64),
        margin: format_metric(Column::Margin, record.margin),
        roi: format_metric(Column::Roi, record.roi),
        cpac: format_metric(Column::Cpac, record.cpac),
        rpac: format_metric(Column::Rpac, record.rpac),
    }
}

pub fn format_totals(totals: &Totals) -> FormattedMetrics {
    FormattedMetrics {
        spend: format_metric(Column::Spend, totals.spend),
        clicks: format_metric(Column::Clicks, totals.clicks as f64),
        impressions: format_metric(Column::Impressions, totals.impressions as f64),
        revenue: format_metric(Column::Revenue, totals.revenue),
        ad_clicks: format_metric(Column::AdClicks, totals.ad_clicks as f64),
        views: format_metric(Column::Views, totals.views as f64),
        margin: format_metric(Column::Margin, totals.margin),
        roi: format_metric(Column::Roi, totals.roi),
        cpac: format_metric(Column::Cpac, totals.cpac),
        rpac: format_metric(Column::Rpac, totals.rpac),
    }
}
