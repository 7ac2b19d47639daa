//! Typed filter expressions evaluated against rollup records.
//!
//! A filter whose operator does not fit its column (e.g. `contains` on
//! `spend`, `greater_than` on `name`) or whose value cannot be read as a
//! number for a numeric column passes every record. [`Filter::validate`]
//! reports those combinations for callers that want to reject them up front.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::model::{AggregationLevel, Column, RollupRecord};

const NUMERIC_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FilterValue::Number(n) => Cow::Owned(n.to_string()),
            FilterValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            FilterValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    InList,
    NotInList,
    GreaterThan,
    LessThan,
    GreaterThanOrEquals,
    LessThanOrEquals,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "not_contains",
            FilterOperator::InList => "in_list",
            FilterOperator::NotInList => "not_in_list",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::LessThan => "less_than",
            FilterOperator::GreaterThanOrEquals => "greater_than_or_equals",
            FilterOperator::LessThanOrEquals => "less_than_or_equals",
        }
    }

    pub fn applies_to_text(self) -> bool {
        matches!(
            self,
            FilterOperator::Equals
                | FilterOperator::NotEquals
                | FilterOperator::Contains
                | FilterOperator::NotContains
                | FilterOperator::InList
                | FilterOperator::NotInList
        )
    }

    pub fn applies_to_numbers(self) -> bool {
        matches!(
            self,
            FilterOperator::Equals
                | FilterOperator::NotEquals
                | FilterOperator::GreaterThan
                | FilterOperator::LessThan
                | FilterOperator::GreaterThanOrEquals
                | FilterOperator::LessThanOrEquals
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub level: AggregationLevel,
    pub column: Column,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(
        level: AggregationLevel,
        column: Column,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            level,
            column,
            operator,
            value: value.into(),
        }
    }

    pub fn is_name_filter(&self) -> bool {
        self.column == Column::Name
    }

    pub fn matches(&self, record: &RollupRecord) -> bool {
        match record.numeric(self.column) {
            None => self.matches_text(&record.name),
            Some(actual) => self.matches_number(actual),
        }
    }

    /// Evaluate against a display name. Filters on numeric columns pass.
    pub fn matches_text(&self, actual: &str) -> bool {
        if self.column.is_numeric() || !self.operator.applies_to_text() {
            return true;
        }
        let actual = actual.to_lowercase();
        let expected = self.value.as_text().to_lowercase();
        match self.operator {
            FilterOperator::Equals => actual == expected,
            FilterOperator::NotEquals => actual != expected,
            FilterOperator::Contains => actual.contains(&expected),
            FilterOperator::NotContains => !actual.contains(&expected),
            FilterOperator::InList => list_entries(&expected).any(|entry| entry == actual),
            FilterOperator::NotInList => !list_entries(&expected).any(|entry| entry == actual),
            _ => true,
        }
    }

    fn matches_number(&self, actual: f64) -> bool {
        if !self.operator.applies_to_numbers() {
            return true;
        }
        let Some(expected) = self.value.as_number() else {
            return true;
        };
        match self.operator {
            FilterOperator::Equals => (actual - expected).abs() < NUMERIC_EPSILON,
            FilterOperator::NotEquals => (actual - expected).abs() >= NUMERIC_EPSILON,
            FilterOperator::GreaterThan => actual > expected,
            FilterOperator::LessThan => actual < expected,
            FilterOperator::GreaterThanOrEquals => actual >= expected - NUMERIC_EPSILON,
            FilterOperator::LessThanOrEquals => actual <= expected + NUMERIC_EPSILON,
            _ => true,
        }
    }

    /// Reject column/operator/value combinations that [`Filter::matches`]
    /// would silently ignore.
    pub fn validate(&self) -> Result<(), FilterError> {
        let column = self.column.as_str();
        let operator = self.operator.as_str();
        if self.column.is_numeric() {
            if !self.operator.applies_to_numbers() {
                return Err(FilterError::OperatorNotForNumbers { column, operator });
            }
            if self.value.as_number().is_none() {
                return Err(FilterError::NotANumber {
                    column,
                    value: self.value.as_text().into_owned(),
                });
            }
        } else if !self.operator.applies_to_text() {
            return Err(FilterError::OperatorNotForText { column, operator });
        }
        Ok(())
    }
}

fn list_entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|entry| !entry.is_empty())
}

/// Filters whose level is `level`.
pub fn at_level(filters: &[Filter], level: AggregationLevel) -> impl Iterator<Item = &Filter> {
    filters.iter().filter(move |filter| filter.level == level)
}

/// `true` iff `record` satisfies every filter at `level`.
pub fn passes(filters: &[Filter], level: AggregationLevel, record: &RollupRecord) -> bool {
    at_level(filters, level).all(|filter| filter.matches(record))
}

/// `true` iff `name` satisfies every `name` filter at `level`.
pub fn name_passes(filters: &[Filter], level: AggregationLevel, name: &str) -> bool {
    at_level(filters, level)
        .filter(|filter| filter.is_name_filter())
        .all(|filter| filter.matches_text(name))
}

pub fn has_name_filters(filters: &[Filter], level: AggregationLevel) -> bool {
    at_level(filters, level).any(Filter::is_name_filter)
}

pub fn validate_all(filters: &[Filter]) -> Result<(), FilterError> {
    filters.iter().try_for_each(Filter::validate)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::BaseMetrics;

    fn ad(name: &str, spend: f64) -> RollupRecord {
        RollupRecord::new(
            "ad_1",
            name,
            BaseMetrics {
                spend,
                ..BaseMetrics::default()
            },
            BTreeSet::new(),
        )
    }

    #[test]
    fn filters_combine_with_and() {
        let filters = vec![
            Filter::new(
                AggregationLevel::Ad,
                Column::Spend,
                FilterOperator::GreaterThan,
                100.0,
            ),
            Filter::new(
                AggregationLevel::Ad,
                Column::Name,
                FilterOperator::Contains,
                "promo",
            ),
        ];
        assert!(passes(&filters, AggregationLevel::Ad, &ad("summer-promo", 150.0)));
        assert!(!passes(&filters, AggregationLevel::Ad, &ad("launch", 150.0)));
        assert!(!passes(&filters, AggregationLevel::Ad, &ad("summer-promo", 50.0)));
    }

    #[test]
    fn filters_at_other_levels_are_ignored() {
        let filters = vec![Filter::new(
            AggregationLevel::Campaign,
            Column::Spend,
            FilterOperator::GreaterThan,
            1_000.0,
        )];
        assert!(passes(&filters, AggregationLevel::Ad, &ad("x", 1.0)));
    }

    #[test]
    fn in_list_splits_on_newlines() {
        let filter = Filter::new(
            AggregationLevel::Ad,
            Column::Name,
            FilterOperator::InList,
            "alpha\n  Beta \n\n",
        );
        assert!(filter.matches(&ad("beta", 0.0)));
        assert!(!filter.matches(&ad("gamma", 0.0)));

        let negated = Filter {
            operator: FilterOperator::NotInList,
            ..filter
        };
        assert!(negated.matches(&ad("gamma", 0.0)));
        assert!(!negated.matches(&ad("alpha", 0.0)));
    }

    #[test]
    fn mismatched_filters_pass_everything() {
        let text_op_on_number = Filter::new(
            AggregationLevel::Ad,
            Column::Spend,
            FilterOperator::Contains,
            "5",
        );
        let order_op_on_name = Filter::new(
            AggregationLevel::Ad,
            Column::Name,
            FilterOperator::GreaterThan,
            10.0,
        );
        let non_numeric_value = Filter::new(
            AggregationLevel::Ad,
            Column::Spend,
            FilterOperator::GreaterThan,
            "lots",
        );
        let record = ad("anything", 1.0);
        assert!(text_op_on_number.matches(&record));
        assert!(order_op_on_name.matches(&record));
        assert!(non_numeric_value.matches(&record));

        assert!(text_op_on_number.validate().is_err());
        assert!(order_op_on_name.validate().is_err());
        assert!(matches!(
            non_numeric_value.validate(),
            Err(FilterError::NotANumber { .. })
        ));
    }

    #[test]
    fn numeric_values_may_arrive_as_strings() {
        let filter = Filter::new(
            AggregationLevel::Ad,
            Column::Spend,
            FilterOperator::LessThanOrEquals,
            " 150 ",
        );
        assert!(filter.validate().is_ok());
        assert!(filter.matches(&ad("a", 150.0)));
        assert!(!filter.matches(&ad("a", 150.5)));
    }

    #[test]
    fn filter_deserializes_from_wire_shape() {
        let raw = r#"{"level":"ad","column":"ad_clicks","operator":"greater_than_or_equals","value":3}"#;
        let filter: Filter = serde_json::from_str(raw).expect("parse");
        assert_eq!(filter.column, Column::AdClicks);
        assert_eq!(filter.value, FilterValue::Number(3.0));
    }
}
