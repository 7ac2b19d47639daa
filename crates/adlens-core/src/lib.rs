//! Cross-source rollup and analysis engine.
//!
//! Buy-side rows (spend, clicks, impressions keyed by campaign → adset → ad)
//! and sell-side rows (revenue, ad clicks, views keyed by ad) are joined by ad
//! id inside a date window and rolled up into per-level records. Everything in
//! this crate is synchronous and pure: every call rebuilds its intermediate
//! structures from the row slices it is handed.

pub mod config;
pub mod date_window;
pub mod drill;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod model;
pub mod rollup;

pub use error::{CoreError, FilterError};
pub use model::{AggregationLevel, BuysideRow, Column, Dataset, Report, RollupRecord, SellsideRow};
pub use rollup::{compute, compute_records, RollupQuery, RollupResult, PAGE_SIZE};
