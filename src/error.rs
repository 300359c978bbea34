//! Error types for the forecaster

use thiserror::Error;

/// Minimum number of strictly-prior daily observations a feature vector needs
pub const MIN_HISTORY_DAYS: usize = 30;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Invalid price at row {row}: {value:?}")]
    InvalidPrice { row: usize, value: String },

    #[error("Invalid date at row {row}: {value:?}")]
    InvalidDate { row: usize, value: String },

    #[error("Insufficient history: need at least {required} days, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Target date {target} is more than one day past the series end {last}")]
    TargetOutOfRange {
        target: chrono::NaiveDate,
        last: chrono::NaiveDate,
    },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ForecastError {
    /// Stable, machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingColumns { .. } => "missing_columns",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::InvalidDate { .. } => "invalid_date",
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::TargetOutOfRange { .. } => "target_out_of_range",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::DataUnavailable(_) => "data_unavailable",
            Self::PredictionFailed(_) => "prediction_failed",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::Io(_) => "io",
            Self::Csv(_) => "csv",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn insufficient(available: usize) -> Self {
        Self::InsufficientHistory {
            required: MIN_HISTORY_DAYS,
            available,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
