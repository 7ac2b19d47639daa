//! Header contracts and row mappings for each known export format.

use adlens_core::model::{BuysideRow, ReportSource, SellsideRow};

use crate::reader::RawRow;
use crate::value::{parse_amount, parse_count, parse_date, parse_spend};

/// Column headers of a buy-side export, one per [`BuysideRow`] field.
#[derive(Debug)]
pub struct BuysideHeaders {
    pub date: &'static str,
    pub ad_id: &'static str,
    pub ad_name: &'static str,
    pub adset_id: &'static str,
    pub adset_name: &'static str,
    pub campaign_id: &'static str,
    pub campaign_name: &'static str,
    pub spend: &'static str,
    pub clicks: &'static str,
    pub impressions: &'static str,
}

#[derive(Debug)]
pub struct SellsideHeaders {
    pub date: &'static str,
    /// Sub id the tracking link carried; the buy-side ad id.
    pub ad_id: &'static str,
    pub revenue: &'static str,
    pub ad_clicks: &'static str,
    pub views: &'static str,
}

static META: BuysideHeaders = BuysideHeaders {
    date: "Day",
    ad_id: "Ad ID",
    ad_name: "Ad name",
    adset_id: "Ad set ID",
    adset_name: "Ad set name",
    campaign_id: "Campaign ID",
    campaign_name: "Campaign name",
    spend: "Amount spent (USD)",
    clicks: "Link clicks",
    impressions: "Impressions",
};

static TIKTOK: BuysideHeaders = BuysideHeaders {
    date: "By Day",
    ad_id: "Ad ID",
    ad_name: "Ad name",
    adset_id: "Ad group ID",
    adset_name: "Ad group name",
    campaign_id: "Campaign ID",
    campaign_name: "Campaign name",
    spend: "Cost",
    clicks: "Clicks (destination)",
    impressions: "Impressions",
};

static TONIC: SellsideHeaders = SellsideHeaders {
    date: "date",
    ad_id: "subid",
    revenue: "revenue",
    ad_clicks: "clicks",
    views: "views",
};

static SYSTEM1: SellsideHeaders = SellsideHeaders {
    date: "Date",
    ad_id: "Sub ID",
    revenue: "Estimated Revenue",
    ad_clicks: "Ad Clicks",
    views: "Page Views",
};

#[derive(Debug, Clone, Copy)]
pub enum SourceLayout {
    Buyside(&'static BuysideHeaders),
    Sellside(&'static SellsideHeaders),
}

impl SourceLayout {
    pub fn of(source: ReportSource) -> Self {
        match source {
            ReportSource::Meta => SourceLayout::Buyside(&META),
            ReportSource::Tiktok => SourceLayout::Buyside(&TIKTOK),
            ReportSource::Tonic => SourceLayout::Sellside(&TONIC),
            ReportSource::System1 => SourceLayout::Sellside(&SYSTEM1),
        }
    }

    pub fn required_headers(self) -> Vec<&'static str> {
        match self {
            SourceLayout::Buyside(h) => vec![
                h.date,
                h.ad_id,
                h.ad_name,
                h.adset_id,
                h.adset_name,
                h.campaign_id,
                h.campaign_name,
                h.spend,
                h.clicks,
                h.impressions,
            ],
            SourceLayout::Sellside(h) => vec![h.date, h.ad_id, h.revenue, h.ad_clicks, h.views],
        }
    }
}

pub fn required_headers(source: ReportSource) -> Vec<&'static str> {
    SourceLayout::of(source).required_headers()
}

impl BuysideHeaders {
    /// `None` when the date is blank or unreadable, or the ad id is blank.
    pub fn map(&self, row: &RawRow<'_>) -> Option<BuysideRow> {
        let date = parse_date(row.get(self.date))?;
        let ad_id = row.get(self.ad_id);
        if ad_id.is_empty() {
            return None;
        }
        Some(BuysideRow {
            date,
            ad_id: ad_id.to_string(),
            ad_name: row.get(self.ad_name).to_string(),
            adset_id: row.get(self.adset_id).to_string(),
            adset_name: row.get(self.adset_name).to_string(),
            campaign_id: row.get(self.campaign_id).to_string(),
            campaign_name: row.get(self.campaign_name).to_string(),
            spend: parse_spend(row.get(self.spend)),
            clicks: parse_count(row.get(self.clicks)),
            impressions: parse_count(row.get(self.impressions)),
        })
    }
}

impl SellsideHeaders {
    pub fn map(&self, row: &RawRow<'_>) -> Option<SellsideRow> {
        let date = parse_date(row.get(self.date))?;
        let ad_id = row.get(self.ad_id);
        if ad_id.is_empty() {
            return None;
        }
        Some(SellsideRow {
            date,
            ad_id: ad_id.to_string(),
            revenue: parse_amount(row.get(self.revenue)),
            ad_clicks: parse_count(row.get(self.ad_clicks)),
            views: parse_count(row.get(self.views)),
        })
    }
}
