use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Raised only by [`crate::filter::Filter::validate`]. Evaluation itself never
/// fails; a mismatched filter simply passes every record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("operator `{operator}` cannot be applied to text column `{column}`")]
    OperatorNotForText {
        column: &'static str,
        operator: &'static str,
    },

    #[error("operator `{operator}` cannot be applied to numeric column `{column}`")]
    OperatorNotForNumbers {
        column: &'static str,
        operator: &'static str,
    },

    #[error("value `{value}` is not a number (column `{column}`)")]
    NotANumber { column: &'static str, value: String },
}
