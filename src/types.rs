//! Core types used throughout the forecaster

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize, Serializer};

pub const CURRENCY: &str = "USD";
pub const UNIT: &str = "metric_ton";

/// Canonical feature order
pub const FEATURE_NAMES: [&str; 7] = [
    "lag_1",
    "lag_7",
    "lag_30",
    "rolling_mean_7",
    "rolling_mean_30",
    "day_of_week",
    "month",
];

/// One raw observation from the price feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub price: f64,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Predictive state as of the day before a target date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub lag_1: f64,
    pub lag_7: f64,
    pub lag_30: f64,
    pub rolling_mean_7: f64,
    pub rolling_mean_30: f64,
    /// Target date weekday, Monday = 0
    pub day_of_week: u32,
    /// Target date month, 1-12
    pub month: u32,
}

impl FeatureVector {
    /// Look up a feature by its schema name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "lag_1" => Some(self.lag_1),
            "lag_7" => Some(self.lag_7),
            "lag_30" => Some(self.lag_30),
            "rolling_mean_7" => Some(self.rolling_mean_7),
            "rolling_mean_30" => Some(self.rolling_mean_30),
            "day_of_week" => Some(self.day_of_week as f64),
            "month" => Some(self.month as f64),
            _ => None,
        }
    }

    /// Values in canonical `FEATURE_NAMES` order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.lag_1,
            self.lag_7,
            self.lag_30,
            self.rolling_mean_7,
            self.rolling_mean_30,
            self.day_of_week as f64,
            self.month as f64,
        ]
    }

    /// Values in the order a trained model expects. Unknown names are an error.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<f64>, String> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .ok_or_else(|| format!("unknown feature '{}'", name))
            })
            .collect()
    }
}

/// Point forecast returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction_date")]
    pub target_date: NaiveDate,
    #[serde(rename = "predicted_price_usd_per_ton")]
    pub predicted_price: f64,
    pub currency: String,
    pub unit: String,
    #[serde(rename = "model_confidence")]
    pub confidence: f64,
    #[serde(rename = "timestamp", serialize_with = "serialize_local_timestamp")]
    pub generated_at: DateTime<FixedOffset>,
}

/// Service liveness and readiness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub model_features: Option<Vec<String>>,
    pub data_exists: bool,
    pub server_time: String,
}

/// ISO-8601 with explicit offset, whole seconds
pub fn format_local_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn serialize_local_timestamp<S: Serializer>(
    ts: &DateTime<FixedOffset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_local_timestamp(ts))
}

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
