use std::sync::Arc;

use adlens_core::config::Config;
use adlens_core::date_window::business_today;
use adlens_store::{InMemoryReportStore, ReportRepository};
use chrono::NaiveDate;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Uploaded report history. Handlers take row snapshots from it and
    /// compute outside the lock.
    pub reports: Arc<dyn ReportRepository>,
}

impl AppState {
    pub fn new(config: Config, reports: Arc<dyn ReportRepository>) -> Self {
        Self {
            config: Arc::new(config),
            reports,
        }
    }

    /// State backed by a fresh process-local store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryReportStore::new()))
    }

    /// Today in the configured business timezone.
    pub fn business_today(&self) -> NaiveDate {
        business_today(self.config.business_utc_offset_hours)
    }
}
