//! Error types for the RFM pipeline

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors surfaced by ingestion, scoring and export.
#[derive(Debug, Error)]
pub enum RfmError {
    /// Failure inside the CSV reader or writer
    #[error("table error: {0}")]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A required input column is absent from the header
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A data row could not be parsed; `row` is 1-based, header excluded
    #[error("malformed row {row}: column '{column}' value '{value}': {reason}")]
    MalformedRow {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// Nothing to derive quintile cut points from
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The metric matrix could not be laid out
    #[error("metric matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("metric '{metric}' has non-finite value {value}")]
    InvalidMetric { metric: &'static str, value: f64 },

    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// A re-read export does not match what the pipeline would produce
    #[error("inconsistent export at row {row}: {reason}")]
    InconsistentExport { row: usize, reason: String },
}
