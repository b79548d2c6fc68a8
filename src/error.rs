use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("cannot build RFM table: no delivered order lines in the selected window")]
    EmptyRfmInput,
    #[error("invalid date range {start} to {end}: {reason}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },
    #[error("dataset contains no order lines")]
    EmptyDataset,
    #[error("required column `{0}` is missing from the dataset")]
    MissingColumn(String),
    #[error("aggregated column `{0}` has an unexpected null")]
    InvalidAggregate(String),
    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalyticsError {
    pub(crate) fn invalid_record(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRecord { row, reason: reason.into() }
    }
}
