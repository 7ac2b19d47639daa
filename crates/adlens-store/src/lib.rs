use std::sync::Arc;

use adlens_core::model::{Dataset, Report, ReportSummary};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("report already uploaded as {existing_filename}")]
    Duplicate { id: String, existing_filename: String },

    #[error("report not found: {0}")]
    NotFound(String),
}

/// Storage interface for uploaded reports.
///
/// Reports are identified by content hash, so adding one whose id is already
/// present is rejected regardless of filename.
#[async_trait]
pub trait ReportRepository: Send + Sync + 'static {
    async fn add(&self, report: Report) -> Result<Arc<Report>, StoreError>;
    async fn remove(&self, id: &str) -> Result<Arc<Report>, StoreError>;
    /// Every report, in upload order.
    async fn list(&self) -> Vec<Arc<Report>>;

    async fn summaries(&self) -> Vec<ReportSummary> {
        self.list().await.iter().map(|report| report.summary()).collect()
    }

    /// Row snapshot of every loaded report.
    async fn dataset(&self) -> Dataset {
        let reports = self.list().await;
        Dataset::from_reports(reports.iter().map(Arc::as_ref))
    }
}

/// Process-local report history.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<Vec<Arc<Report>>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportStore {
    async fn add(&self, report: Report) -> Result<Arc<Report>, StoreError> {
        let mut reports = self.reports.write().await;
        if let Some(existing) = reports.iter().find(|r| r.id == report.id) {
            return Err(StoreError::Duplicate {
                id: report.id,
                existing_filename: existing.filename.clone(),
            });
        }
        let report = Arc::new(report);
        reports.push(Arc::clone(&report));
        info!(
            report_id = %report.id,
            source = %report.source,
            rows = report.rows.len(),
            loaded = reports.len(),
            "report stored"
        );
        Ok(report)
    }

    async fn remove(&self, id: &str) -> Result<Arc<Report>, StoreError> {
        let mut reports = self.reports.write().await;
        let index = reports
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = reports.remove(index);
        debug!(report_id = %id, loaded = reports.len(), "report removed");
        Ok(removed)
    }

    async fn list(&self) -> Vec<Arc<Report>> {
        self.reports.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use adlens_core::model::{ReportRows, ReportSource, SellsideRow};
    use chrono::Utc;

    use super::*;

    fn report(id: &str, filename: &str, ad: &str) -> Report {
        Report {
            id: id.to_string(),
            source: ReportSource::Tonic,
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
            rows: ReportRows::Sellside(vec![SellsideRow {
                date: "2024-01-01".to_string(),
                ad_id: ad.to_string(),
                revenue: 1.0,
                ad_clicks: 1,
                views: 1,
            }]),
        }
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected() {
        let store = InMemoryReportStore::new();
        store.add(report("r1", "first.csv", "a1")).await.expect("add");
        let err = store
            .add(report("r1", "renamed.csv", "a1"))
            .await
            .expect_err("duplicate");
        assert_eq!(
            err,
            StoreError::Duplicate {
                id: "r1".to_string(),
                existing_filename: "first.csv".to_string(),
            }
        );
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn remove_unloads_once() {
        let store = InMemoryReportStore::new();
        store.add(report("r1", "a.csv", "a1")).await.expect("add");
        store.add(report("r2", "b.csv", "a2")).await.expect("add");

        let removed = store.remove("r1").await.expect("remove");
        assert_eq!(removed.filename, "a.csv");
        assert_eq!(
            store.remove("r1").await.expect_err("gone"),
            StoreError::NotFound("r1".to_string())
        );

        let ids: Vec<String> = store.summaries().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["r2"]);
    }

    #[tokio::test]
    async fn dataset_concatenates_loaded_rows() {
        let store = InMemoryReportStore::new();
        store.add(report("r1", "a.csv", "a1")).await.expect("add");
        store.add(report("r2", "b.csv", "a2")).await.expect("add");
        let dataset = store.dataset().await;
        assert!(dataset.buyside.is_empty());
        let ads: Vec<&str> = dataset.sellside.iter().map(|r| r.ad_id.as_str()).collect();
        assert_eq!(ads, vec!["a1", "a2"]);
    }
}
