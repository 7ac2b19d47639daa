//! Drill-down state for the analysis view.
//!
//! Holds the user-facing inputs of a rollup (level, window, filters, sort,
//! page) together with the drill-down scopes and the current selection, and
//! applies the transitions the view exposes. Every transition that changes
//! what is being looked at resets pagination to page 1.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::date_window::DateWindow;
use crate::filter::Filter;
use crate::model::{AggregationLevel, Column};
use crate::rollup::{AncestryPolicy, RollupQuery, SortSpec};

/// A transition of [`AnalysisState`], as sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DrillAction {
    ToggleSelection { id: String },
    DrillInto { id: String },
    SetLevel { level: AggregationLevel },
    SetWindow { window: DateWindow },
    SetFilters { filters: Vec<Filter> },
    AddFilter { filter: Filter },
    RemoveFilter { index: usize },
    ToggleSort { column: Column },
    SetPage { page: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisState {
    pub level: AggregationLevel,
    pub window: DateWindow,
    pub filters: Vec<Filter>,
    pub campaign_scope: BTreeSet<String>,
    pub adset_scope: BTreeSet<String>,
    /// Ids selected at the current level.
    pub selection: BTreeSet<String>,
    pub sort: Option<SortSpec>,
    pub page: usize,
    pub ancestry: Option<AncestryPolicy>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            level: AggregationLevel::Campaign,
            window: DateWindow::default(),
            filters: Vec::new(),
            campaign_scope: BTreeSet::new(),
            adset_scope: BTreeSet::new(),
            selection: BTreeSet::new(),
            sort: None,
            page: 1,
            ancestry: None,
        }
    }
}

impl AnalysisState {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, action: DrillAction) {
        match action {
            DrillAction::ToggleSelection { id } => self.toggle_selection(&id),
            DrillAction::DrillInto { id } => self.drill_into(&id),
            DrillAction::SetLevel { level } => self.set_level(level),
            DrillAction::SetWindow { window } => self.set_window(window),
            DrillAction::SetFilters { filters } => self.set_filters(filters),
            DrillAction::AddFilter { filter } => self.add_filter(filter),
            DrillAction::RemoveFilter { index } => {
                self.remove_filter(index);
            }
            DrillAction::ToggleSort { column } => self.toggle_sort(column),
            DrillAction::SetPage { page } => self.set_page(page),
        }
    }

    pub fn toggle_selection(&mut self, id: &str) {
        if !self.selection.remove(id) {
            self.selection.insert(id.to_string());
        }
    }

    /// Click-through on an entity name: scope the next level to that entity
    /// alone. No-op at Ad level.
    pub fn drill_into(&mut self, id: &str) {
        let Some(next) = self.level.finer() else {
            return;
        };
        let scope = BTreeSet::from([id.to_string()]);
        match self.level {
            AggregationLevel::Campaign => self.set_campaign_scope(scope),
            AggregationLevel::Adset => self.adset_scope = scope,
            AggregationLevel::Ad => {}
        }
        self.enter(next);
    }

    /// Switch level. Moving finer folds the current selection into the scope
    /// of the level being left; moving coarser drops every scope at or below
    /// the new level.
    pub fn set_level(&mut self, level: AggregationLevel) {
        if level == self.level {
            return;
        }
        if level.is_finer_than(self.level) {
            let selected = std::mem::take(&mut self.selection);
            if !selected.is_empty() {
                match self.level {
                    AggregationLevel::Campaign => {
                        let mut scope = self.campaign_scope.clone();
                        scope.extend(selected);
                        self.set_campaign_scope(scope);
                    }
                    AggregationLevel::Adset => self.adset_scope.extend(selected),
                    AggregationLevel::Ad => {}
                }
            }
        } else {
            if level == AggregationLevel::Campaign {
                self.campaign_scope.clear();
            }
            self.adset_scope.clear();
        }
        self.enter(level);
    }

    pub fn set_window(&mut self, window: DateWindow) {
        self.window = window;
        self.invalidate();
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.filters = filters;
        self.invalidate();
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
        self.invalidate();
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<Filter> {
        if index >= self.filters.len() {
            return None;
        }
        let removed = self.filters.remove(index);
        self.invalidate();
        Some(removed)
    }

    pub fn toggle_sort(&mut self, column: Column) {
        self.sort = SortSpec::toggle(self.sort, column);
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn query(&self) -> RollupQuery {
        RollupQuery {
            level: self.level,
            window: self.window,
            filters: self.filters.clone(),
            campaign_scope: self.campaign_scope.clone(),
            adset_scope: if self.level == AggregationLevel::Ad {
                self.adset_scope.clone()
            } else {
                BTreeSet::new()
            },
            sort: self.sort,
            page: self.page,
            ancestry: self.ancestry,
        }
    }

    /// Adset picks made under a different campaign scope are stale.
    fn set_campaign_scope(&mut self, scope: BTreeSet<String>) {
        if scope != self.campaign_scope {
            self.adset_scope.clear();
        }
        self.campaign_scope = scope;
    }

    fn enter(&mut self, level: AggregationLevel) {
        self.level = level;
        self.selection.clear();
        self.page = 1;
    }

    fn invalidate(&mut self) {
        self.selection.clear();
        self.page = 1;
    }
}
