use polars::error::PolarsError;
use thiserror::Error;

/// Failures raised by the feature and forecasting pipeline.
///
/// Errors are scoped to one instrument and one model; the batch driver
/// records them and keeps going.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("insufficient history: {available} usable rows, need more than {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("empty dataset: series length {len} does not exceed lookback {lookback}")]
    EmptyDataset { len: usize, lookback: usize },

    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
