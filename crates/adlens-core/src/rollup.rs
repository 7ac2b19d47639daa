//! Campaign / adset / ad rollups over date-scoped buy-side and sell-side rows.
//!
//! A rollup pass is a pure function of its inputs:
//!
//! 1. both sides are scoped to the expanded date window;
//! 2. sell-side rows are summed per ad, and each ad's adset/campaign is
//!    resolved once under the query's [`AncestryPolicy`];
//! 3. buy-side rows (narrowed by ancestor name filters and drill-down scopes)
//!    are grouped by the id of the requested level;
//! 4. each group picks up the sell-side totals of the ads resolved under it,
//!    derived metrics are computed, level filters applied, then sort and page.
//!
//! An ad that only appears on the sell side has no buy-side group to land in
//! and is absent from every level.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::date_window::DateWindow;
use crate::filter::{self, Filter};
use crate::model::{
    AggregationLevel, BaseMetrics, BuysideRow, Column, Dataset, RollupRecord, SellsideRow, Totals,
};

pub const PAGE_SIZE: usize = 50;

/// How an ad's adset (and an adset's campaign) is chosen when the window
/// holds rows that disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestryPolicy {
    /// The latest row in input order wins.
    #[default]
    LastSeen,
    FirstSeen,
}

impl AncestryPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "last_seen" => Some(AncestryPolicy::LastSeen),
            "first_seen" => Some(AncestryPolicy::FirstSeen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Header-click cycle: a new column sorts ascending, a second click on the
    /// same column sorts descending, a third clears the sort.
    pub fn toggle(current: Option<SortSpec>, column: Column) -> Option<SortSpec> {
        match current {
            Some(SortSpec {
                column: active,
                direction: SortDirection::Asc,
            }) if active == column => Some(SortSpec {
                column,
                direction: SortDirection::Desc,
            }),
            Some(SortSpec {
                column: active,
                direction: SortDirection::Desc,
            }) if active == column => None,
            _ => Some(SortSpec {
                column,
                direction: SortDirection::Asc,
            }),
        }
    }
}

/// Everything a rollup pass depends on besides the rows themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupQuery {
    pub level: AggregationLevel,
    pub window: DateWindow,
    pub filters: Vec<Filter>,
    /// Campaign ids drilled into; empty means no restriction.
    pub campaign_scope: BTreeSet<String>,
    /// Adset ids drilled into; only consulted at Ad level.
    pub adset_scope: BTreeSet<String>,
    pub sort: Option<SortSpec>,
    /// 1-based.
    pub page: usize,
    pub ancestry: Option<AncestryPolicy>,
}

impl Default for RollupQuery {
    fn default() -> Self {
        Self {
            level: AggregationLevel::Campaign,
            window: DateWindow::default(),
            filters: Vec::new(),
            campaign_scope: BTreeSet::new(),
            adset_scope: BTreeSet::new(),
            sort: None,
            page: 1,
            ancestry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupResult {
    pub totals: Totals,
    pub page: Vec<RollupRecord>,
    pub page_number: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

/// Full pass: filtered, sorted and paginated, plus the totals row over the
/// whole filtered set.
pub fn compute(
    buyside: &[BuysideRow],
    sellside: &[SellsideRow],
    query: &RollupQuery,
) -> RollupResult {
    let records = compute_records(buyside, sellside, query);
    let totals = Totals::from_records(&records);
    let (page, page_number, total_pages) = paginate(&records, query.page);
    RollupResult {
        totals,
        page,
        page_number,
        total_pages,
        total_records: records.len(),
    }
}

/// Filtered and sorted records for the requested level, unpaginated.
pub fn compute_records(
    buyside: &[BuysideRow],
    sellside: &[SellsideRow],
    query: &RollupQuery,
) -> Vec<RollupRecord> {
    let days = query.window.day_set();
    let rows: Vec<&BuysideRow> = buyside.iter().filter(|row| days.contains(&row.date)).collect();
    let sell = SellTotals::by_ad(sellside.iter().filter(|row| days.contains(&row.date)));
    let ancestry = Ancestry::resolve(&rows, query.ancestry.unwrap_or_default());

    let mut records = match query.level {
        AggregationLevel::Campaign => campaign_pass(&rows, &sell, &ancestry),
        AggregationLevel::Adset => adset_pass(&rows, &sell, &ancestry, query),
        AggregationLevel::Ad => ad_pass(&rows, &sell, &ancestry, query),
    };
    let grouped = records.len();
    records.retain(|record| filter::passes(&query.filters, query.level, record));
    sort_records(&mut records, query.sort);

    debug!(
        level = query.level.as_str(),
        days = days.len(),
        buyside_rows = rows.len(),
        grouped,
        kept = records.len(),
        "rollup pass"
    );
    records
}

impl Dataset {
    pub fn rollup(&self, query: &RollupQuery) -> RollupResult {
        compute(&self.buyside, &self.sellside, query)
    }

    pub fn rollup_records(&self, query: &RollupQuery) -> Vec<RollupRecord> {
        compute_records(&self.buyside, &self.sellside, query)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SellTotals {
    revenue: f64,
    ad_clicks: u64,
    views: u64,
}

impl SellTotals {
    fn by_ad<'a>(rows: impl Iterator<Item = &'a SellsideRow>) -> HashMap<&'a str, SellTotals> {
        let mut totals: HashMap<&str, SellTotals> = HashMap::new();
        for row in rows {
            let entry = totals.entry(row.ad_id.as_str()).or_default();
            entry.add(SellTotals {
                revenue: row.revenue,
                ad_clicks: row.ad_clicks,
                views: row.views,
            });
        }
        totals
    }

    fn add(&mut self, other: SellTotals) {
        self.revenue += other.revenue;
        self.ad_clicks = self.ad_clicks.saturating_add(other.ad_clicks);
        self.views = self.views.saturating_add(other.views);
    }
}

/// Parent links and display names resolved from the scoped buy-side rows.
struct Ancestry<'a> {
    ad_adset: HashMap<&'a str, &'a str>,
    ad_campaign: HashMap<&'a str, &'a str>,
    campaign_names: HashMap<&'a str, &'a str>,
    adset_names: HashMap<&'a str, &'a str>,
    ad_names: HashMap<&'a str, &'a str>,
}

impl<'a> Ancestry<'a> {
    fn resolve(rows: &[&'a BuysideRow], policy: AncestryPolicy) -> Self {
        let mut ancestry = Ancestry {
            ad_adset: HashMap::new(),
            ad_campaign: HashMap::new(),
            campaign_names: HashMap::new(),
            adset_names: HashMap::new(),
            ad_names: HashMap::new(),
        };
        for row in rows {
            let ad = row.ad_id.as_str();
            let adset = row.adset_id.as_str();
            let campaign = row.campaign_id.as_str();
            record_link(&mut ancestry.ad_adset, ad, adset, policy);
            record_link(&mut ancestry.ad_campaign, ad, campaign, policy);
            record_name(&mut ancestry.campaign_names, campaign, &row.campaign_name, policy);
            record_name(&mut ancestry.adset_names, adset, &row.adset_name, policy);
            record_name(&mut ancestry.ad_names, ad, &row.ad_name, policy);
        }
        ancestry
    }

    fn name(&self, level: AggregationLevel, id: &'a str) -> &'a str {
        let names = match level {
            AggregationLevel::Campaign => &self.campaign_names,
            AggregationLevel::Adset => &self.adset_names,
            AggregationLevel::Ad => &self.ad_names,
        };
        names.get(id).copied().unwrap_or(id)
    }

    /// Whether `ad` is attributed to the entity `id` at `level` for sell-side
    /// purposes.
    fn ad_belongs_to(&self, ad: &str, level: AggregationLevel, id: &str) -> bool {
        match level {
            AggregationLevel::Campaign => self.ad_campaign.get(ad).is_some_and(|c| *c == id),
            AggregationLevel::Adset => self.ad_adset.get(ad).is_some_and(|s| *s == id),
            AggregationLevel::Ad => ad == id,
        }
    }
}

fn record_link<'a>(
    links: &mut HashMap<&'a str, &'a str>,
    child: &'a str,
    parent: &'a str,
    policy: AncestryPolicy,
) {
    match policy {
        AncestryPolicy::LastSeen => {
            links.insert(child, parent);
        }
        AncestryPolicy::FirstSeen => {
            links.entry(child).or_insert(parent);
        }
    }
}

fn record_name<'a>(
    names: &mut HashMap<&'a str, &'a str>,
    id: &'a str,
    name: &'a str,
    policy: AncestryPolicy,
) {
    if name.trim().is_empty() {
        return;
    }
    record_link(names, id, name, policy);
}

/// Buy-side accumulator for one entity.
struct Group<'a> {
    id: &'a str,
    spend: f64,
    clicks: u64,
    impressions: u64,
    children: BTreeSet<&'a str>,
    ads: BTreeSet<&'a str>,
}

/// Group rows by the id of `level`, keeping first-appearance order.
fn group_rows<'a>(rows: impl Iterator<Item = &'a BuysideRow>, level: AggregationLevel) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for row in rows {
        let (id, child) = match level {
            AggregationLevel::Campaign => (row.campaign_id.as_str(), Some(row.adset_id.as_str())),
            AggregationLevel::Adset => (row.adset_id.as_str(), Some(row.ad_id.as_str())),
            AggregationLevel::Ad => (row.ad_id.as_str(), None),
        };
        let slot = *index.entry(id).or_insert_with(|| {
            groups.push(Group {
                id,
                spend: 0.0,
                clicks: 0,
                impressions: 0,
                children: BTreeSet::new(),
                ads: BTreeSet::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.spend += row.spend;
        group.clicks = group.clicks.saturating_add(row.clicks);
        group.impressions = group.impressions.saturating_add(row.impressions);
        group.ads.insert(row.ad_id.as_str());
        if let Some(child) = child {
            group.children.insert(child);
        }
    }
    groups
}

fn to_records<'a>(
    groups: Vec<Group<'a>>,
    level: AggregationLevel,
    sell: &HashMap<&str, SellTotals>,
    ancestry: &Ancestry<'a>,
) -> Vec<RollupRecord> {
    groups
        .into_iter()
        .map(|group| {
            let mut joined = SellTotals::default();
            for ad in &group.ads {
                if ancestry.ad_belongs_to(ad, level, group.id) {
                    if let Some(totals) = sell.get(ad) {
                        joined.add(*totals);
                    }
                }
            }
            RollupRecord::new(
                group.id,
                ancestry.name(level, group.id),
                BaseMetrics {
                    spend: group.spend,
                    clicks: group.clicks,
                    impressions: group.impressions,
                    revenue: joined.revenue,
                    ad_clicks: joined.ad_clicks,
                    views: joined.views,
                },
                group.children.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

fn campaign_pass<'a>(
    rows: &[&'a BuysideRow],
    sell: &HashMap<&str, SellTotals>,
    ancestry: &Ancestry<'a>,
) -> Vec<RollupRecord> {
    let groups = group_rows(rows.iter().copied(), AggregationLevel::Campaign);
    to_records(groups, AggregationLevel::Campaign, sell, ancestry)
}

fn adset_pass<'a>(
    rows: &[&'a BuysideRow],
    sell: &HashMap<&str, SellTotals>,
    ancestry: &Ancestry<'a>,
    query: &RollupQuery,
) -> Vec<RollupRecord> {
    let campaigns = allowed_campaigns(rows, ancestry, query);
    let scoped = rows
        .iter()
        .copied()
        .filter(|row| is_allowed(&campaigns, &row.campaign_id));
    let groups = group_rows(scoped, AggregationLevel::Adset);
    to_records(groups, AggregationLevel::Adset, sell, ancestry)
}

fn ad_pass<'a>(
    rows: &[&'a BuysideRow],
    sell: &HashMap<&str, SellTotals>,
    ancestry: &Ancestry<'a>,
    query: &RollupQuery,
) -> Vec<RollupRecord> {
    let campaigns = allowed_campaigns(rows, ancestry, query);
    let adsets = allowed_adsets(rows, ancestry, query);
    let scoped = rows.iter().copied().filter(|row| {
        is_allowed(&campaigns, &row.campaign_id) && is_allowed(&adsets, &row.adset_id)
    });
    let groups = group_rows(scoped, AggregationLevel::Ad);
    to_records(groups, AggregationLevel::Ad, sell, ancestry)
}

/// `None` means unrestricted.
fn is_allowed(allowed: &Option<HashSet<&str>>, id: &str) -> bool {
    allowed.as_ref().is_none_or(|set| set.contains(id))
}

/// Campaigns passing every Campaign-level `name` filter, intersected with the
/// campaign scope. `None` when neither constraint is active.
fn allowed_campaigns<'a>(
    rows: &[&'a BuysideRow],
    ancestry: &Ancestry<'a>,
    query: &RollupQuery,
) -> Option<HashSet<&'a str>> {
    allowed_ids(
        rows.iter().map(|row| row.campaign_id.as_str()),
        AggregationLevel::Campaign,
        &query.campaign_scope,
        ancestry,
        &query.filters,
    )
}

fn allowed_adsets<'a>(
    rows: &[&'a BuysideRow],
    ancestry: &Ancestry<'a>,
    query: &RollupQuery,
) -> Option<HashSet<&'a str>> {
    allowed_ids(
        rows.iter().map(|row| row.adset_id.as_str()),
        AggregationLevel::Adset,
        &query.adset_scope,
        ancestry,
        &query.filters,
    )
}

fn allowed_ids<'a>(
    candidates: impl Iterator<Item = &'a str>,
    level: AggregationLevel,
    scope: &BTreeSet<String>,
    ancestry: &Ancestry<'a>,
    filters: &[Filter],
) -> Option<HashSet<&'a str>> {
    let filtered = filter::has_name_filters(filters, level);
    if !filtered && scope.is_empty() {
        return None;
    }
    Some(
        candidates
            .filter(|id| scope.is_empty() || scope.contains(*id))
            .filter(|id| !filtered || filter::name_passes(filters, level, ancestry.name(level, *id)))
            .collect(),
    )
}

pub fn sort_records(records: &mut [RollupRecord], sort: Option<SortSpec>) {
    let Some(SortSpec { column, direction }) = sort else {
        return;
    };
    records.sort_by(|a, b| {
        let ordering = compare_by(a, b, column);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare_by(a: &RollupRecord, b: &RollupRecord, column: Column) -> Ordering {
    match (a.numeric(column), b.numeric(column)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

/// Returns `(page, page_number, total_pages)`. Out-of-range pages are clamped
/// to the nearest valid page.
pub fn paginate(records: &[RollupRecord], page: usize) -> (Vec<RollupRecord>, usize, usize) {
    let total_pages = records.len().div_ceil(PAGE_SIZE);
    let page_number = page.clamp(1, total_pages.max(1));
    let start = (page_number - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(records.len());
    let slice = records.get(start..end).unwrap_or(&[]).to_vec();
    (slice, page_number, total_pages)
}
