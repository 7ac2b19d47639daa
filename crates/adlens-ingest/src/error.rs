use adlens_core::model::ReportSource;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required headers for {report_source}: {}", missing.join(", "))]
    MissingHeaders {
        report_source: ReportSource,
        missing: Vec<String>,
    },

    #[error("unreadable report: {0}")]
    Unreadable(String),

    #[error("failed to hash report rows: {0}")]
    Hash(#[from] serde_json::Error),
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Unreadable(err.to_string())
    }
}
