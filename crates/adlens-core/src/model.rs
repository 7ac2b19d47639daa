use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One day of buy-side delivery for a single ad.
///
/// Natural key: `(date, ad_id, adset_id, campaign_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuysideRow {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub ad_id: String,
    pub ad_name: String,
    pub adset_id: String,
    pub adset_name: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
}

impl BuysideRow {
    pub fn natural_key(&self) -> (&str, &str, &str, &str) {
        (&self.date, &self.ad_id, &self.adset_id, &self.campaign_id)
    }

    /// Fold a row with the same natural key into this one. Names keep the
    /// first-seen value.
    pub fn absorb(&mut self, other: &BuysideRow) {
        self.spend += other.spend;
        self.clicks = self.clicks.saturating_add(other.clicks);
        self.impressions = self.impressions.saturating_add(other.impressions);
    }
}

/// One day of sell-side monetization for a single ad.
///
/// Natural key: `(date, ad_id)`. `revenue` may be negative (adjustments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellsideRow {
    pub date: String,
    pub ad_id: String,
    pub revenue: f64,
    pub ad_clicks: u64,
    pub views: u64,
}

impl SellsideRow {
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.date, &self.ad_id)
    }

    pub fn absorb(&mut self, other: &SellsideRow) {
        self.revenue += other.revenue;
        self.ad_clicks = self.ad_clicks.saturating_add(other.ad_clicks);
        self.views = self.views.saturating_add(other.views);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSide {
    Buyside,
    Sellside,
}

/// The export formats the normalizers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Meta,
    Tiktok,
    Tonic,
    System1,
}

impl ReportSource {
    pub const ALL: [ReportSource; 4] = [
        ReportSource::Meta,
        ReportSource::Tiktok,
        ReportSource::Tonic,
        ReportSource::System1,
    ];

    pub fn side(self) -> ReportSide {
        match self {
            ReportSource::Meta | ReportSource::Tiktok => ReportSide::Buyside,
            ReportSource::Tonic | ReportSource::System1 => ReportSide::Sellside,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportSource::Meta => "meta",
            ReportSource::Tiktok => "tiktok",
            ReportSource::Tonic => "tonic",
            ReportSource::System1 => "system1",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "report source",
                value: trimmed.to_string(),
            })
    }
}

impl std::fmt::Display for ReportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "side", content = "rows", rename_all = "snake_case")]
pub enum ReportRows {
    Buyside(Vec<BuysideRow>),
    Sellside(Vec<SellsideRow>),
}

impl ReportRows {
    pub fn side(&self) -> ReportSide {
        match self {
            ReportRows::Buyside(_) => ReportSide::Buyside,
            ReportRows::Sellside(_) => ReportSide::Sellside,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReportRows::Buyside(rows) => rows.len(),
            ReportRows::Sellside(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An uploaded report. Immutable once built; `id` is the content hash of
/// `rows`, so two uploads with the same data share an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub source: ReportSource,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub rows: ReportRows,
}

impl Report {
    pub fn side(&self) -> ReportSide {
        self.rows.side()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            side: self.side(),
            source: self.source,
            filename: self.filename.clone(),
            row_count: self.rows.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub side: ReportSide,
    pub source: ReportSource,
    pub filename: String,
    pub row_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// All rows of every loaded report, split by side.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub buyside: Vec<BuysideRow>,
    pub sellside: Vec<SellsideRow>,
}

impl Dataset {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        let mut dataset = Dataset::default();
        for report in reports {
            match &report.rows {
                ReportRows::Buyside(rows) => dataset.buyside.extend(rows.iter().cloned()),
                ReportRows::Sellside(rows) => dataset.sellside.extend(rows.iter().cloned()),
            }
        }
        dataset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    #[default]
    Campaign,
    Adset,
    Ad,
}

impl AggregationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationLevel::Campaign => "campaign",
            AggregationLevel::Adset => "adset",
            AggregationLevel::Ad => "ad",
        }
    }

    /// The next level down, or `None` at Ad.
    pub fn finer(self) -> Option<Self> {
        match self {
            AggregationLevel::Campaign => Some(AggregationLevel::Adset),
            AggregationLevel::Adset => Some(AggregationLevel::Ad),
            AggregationLevel::Ad => None,
        }
    }

    fn depth(self) -> u8 {
        match self {
            AggregationLevel::Campaign => 0,
            AggregationLevel::Adset => 1,
            AggregationLevel::Ad => 2,
        }
    }

    pub fn is_finer_than(self, other: Self) -> bool {
        self.depth() > other.depth()
    }
}

/// Columns addressable by filters, sorting and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Name,
    Spend,
    Revenue,
    Margin,
    Roi,
    Impressions,
    Clicks,
    Views,
    AdClicks,
    Cpac,
    Rpac,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Currency,
    Percent,
    Count,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Name,
        Column::Spend,
        Column::Revenue,
        Column::Margin,
        Column::Roi,
        Column::Impressions,
        Column::Clicks,
        Column::Views,
        Column::AdClicks,
        Column::Cpac,
        Column::Rpac,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Spend => "spend",
            Column::Revenue => "revenue",
            Column::Margin => "margin",
            Column::Roi => "roi",
            Column::Impressions => "impressions",
            Column::Clicks => "clicks",
            Column::Views => "views",
            Column::AdClicks => "ad_clicks",
            Column::Cpac => "cpac",
            Column::Rpac => "rpac",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Name => ColumnKind::Text,
            Column::Spend | Column::Revenue | Column::Margin | Column::Cpac | Column::Rpac => {
                ColumnKind::Currency
            }
            Column::Roi => ColumnKind::Percent,
            Column::Impressions | Column::Clicks | Column::Views | Column::AdClicks => {
                ColumnKind::Count
            }
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() != ColumnKind::Text
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|column| column.as_str() == trimmed)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "column",
                value: trimmed.to_string(),
            })
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Aggregate for one entity at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupRecord {
    pub id: String,
    pub name: String,
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub revenue: f64,
    pub ad_clicks: u64,
    pub views: u64,
    pub margin: f64,
    pub roi: f64,
    pub cpac: f64,
    pub rpac: f64,
    /// Child entity ids reachable under the current window and scope. Empty at
    /// Ad level.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub children: BTreeSet<String>,
}

/// Raw sums an entity starts from; derived metrics are computed from these.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BaseMetrics {
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub revenue: f64,
    pub ad_clicks: u64,
    pub views: u64,
}

impl RollupRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base: BaseMetrics,
        children: BTreeSet<String>,
    ) -> Self {
        let margin = base.revenue - base.spend;
        let ad_clicks = base.ad_clicks as f64;
        Self {
            id: id.into(),
            name: name.into(),
            spend: base.spend,
            clicks: base.clicks,
            impressions: base.impressions,
            revenue: base.revenue,
            ad_clicks: base.ad_clicks,
            views: base.views,
            margin,
            roi: safe_ratio(margin, base.spend),
            cpac: safe_ratio(base.spend, ad_clicks),
            rpac: safe_ratio(base.revenue, ad_clicks),
            children,
        }
    }

    /// Value of a numeric column; `None` for `name`.
    pub fn numeric(&self, column: Column) -> Option<f64> {
        let value = match column {
            Column::Name => return None,
            Column::Spend => self.spend,
            Column::Revenue => self.revenue,
            Column::Margin => self.margin,
            Column::Roi => self.roi,
            Column::Impressions => self.impressions as f64,
            Column::Clicks => self.clicks as f64,
            Column::Views => self.views as f64,
            Column::AdClicks => self.ad_clicks as f64,
            Column::Cpac => self.cpac,
            Column::Rpac => self.rpac,
        };
        Some(value)
    }
}

/// Summary row over a filtered result set. Ratios are recomputed from the
/// sums, never averaged across rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub spend: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub revenue: f64,
    pub ad_clicks: u64,
    pub views: u64,
    pub margin: f64,
    pub roi: f64,
    pub cpac: f64,
    pub rpac: f64,
}

impl Totals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RollupRecord>) -> Self {
        let mut totals = Totals::default();
        for record in records {
            totals.spend += record.spend;
            totals.clicks = totals.clicks.saturating_add(record.clicks);
            totals.impressions = totals.impressions.saturating_add(record.impressions);
            totals.revenue += record.revenue;
            totals.ad_clicks = totals.ad_clicks.saturating_add(record.ad_clicks);
            totals.views = totals.views.saturating_add(record.views);
            totals.margin += record.margin;
        }
        let ad_clicks = totals.ad_clicks as f64;
        totals.roi = safe_ratio(totals.margin, totals.spend);
        totals.cpac = safe_ratio(totals.spend, ad_clicks);
        totals.rpac = safe_ratio(totals.revenue, ad_clicks);
        totals
    }
}
