//! Date window expansion.
//!
//! Report days are compared as `YYYY-MM-DD` strings. "Today" is anchored to a
//! fixed business UTC offset (UTC-8 by default) so report boundaries match the
//! ad platforms' own day boundary, whatever the viewer's timezone.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_BUSINESS_UTC_OFFSET_HOURS: i32 = -8;

/// Inclusive `from..=to` window. Either bound missing means "no window", which
/// rejects every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// Parse both bounds from `YYYY-MM-DD` strings.
    pub fn parse(from: &str, to: &str) -> Result<Self, CoreError> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map_err(|_| CoreError::InvalidDate(raw.to_string()))
        };
        Ok(Self::new(parse(from)?, parse(to)?))
    }

    /// Every calendar day in the window, oldest first.
    ///
    /// Returns an empty list when a bound is missing or `from > to`.
    pub fn expand(&self) -> Vec<String> {
        let (Some(from), Some(to)) = (self.from, self.to) else {
            return Vec::new();
        };
        if from > to {
            return Vec::new();
        }
        from.iter_days()
            .take_while(|day| *day <= to)
            .map(|day| day.format(DATE_FORMAT).to_string())
            .collect()
    }

    pub fn day_set(&self) -> DaySet {
        DaySet(self.expand().into_iter().collect())
    }
}

/// Membership test over an expanded window.
#[derive(Debug, Clone, Default)]
pub struct DaySet(HashSet<String>);

impl DaySet {
    pub fn contains(&self, date: &str) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn business_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix())
}

pub fn business_today_at(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    now.with_timezone(&business_offset(utc_offset_hours))
        .date_naive()
}

pub fn business_today(utc_offset_hours: i32) -> NaiveDate {
    business_today_at(Utc::now(), utc_offset_hours)
}

/// Named windows relative to business "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePreset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "month_to_date")]
    MonthToDate,
}

impl DatePreset {
    pub fn resolve(self, today: NaiveDate) -> DateWindow {
        match self {
            DatePreset::Today => DateWindow::single(today),
            DatePreset::Yesterday => DateWindow::single(today - Duration::days(1)),
            DatePreset::Last7Days => DateWindow::new(today - Duration::days(6), today),
            DatePreset::Last30Days => DateWindow::new(today - Duration::days(29), today),
            DatePreset::MonthToDate => {
                let first = today.with_day(1).unwrap_or(today);
                DateWindow::new(first, today)
            }
        }
    }
}
