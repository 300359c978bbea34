//! Prediction service
//!
//! Owns the model bundle loaded at startup (never mutated afterwards) and
//! re-reads the price feed on every request.

mod clock;
#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, LocalClock};
#[cfg(test)]
pub use clock::MockClock;

use crate::data::load_price_series;
use crate::error::{ForecastError, Result};
use crate::features::build_next;
use crate::model::{ModelBundle, RandomForestRegressor, Regressor};
use crate::types::{format_local_timestamp, round4, HealthReport, PredictionResult, CURRENCY, UNIT};
use chrono::{Days, Timelike};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_CONFIDENCE: f64 = 0.80;

pub struct PredictionService<M = RandomForestRegressor> {
    bundle: Option<ModelBundle<M>>,
    data_path: PathBuf,
    clock: Arc<dyn Clock>,
    confidence: f64,
}

impl<M: Regressor> PredictionService<M> {
    pub fn new(bundle: Option<ModelBundle<M>>, data_path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            bundle,
            data_path: data_path.into(),
            clock,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Placeholder confidence reported with each prediction, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn model_loaded(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_loaded: self.model_loaded(),
            model_features: self.bundle.as_ref().map(|b| b.features.clone()),
            data_exists: self.data_path.exists(),
            server_time: format_local_timestamp(&self.now()),
        }
    }

    /// Forecast the closing price for tomorrow (local calendar)
    pub fn predict(&self) -> Result<PredictionResult> {
        let bundle = self.bundle.as_ref().ok_or_else(|| {
            ForecastError::ModelUnavailable("no model bundle loaded; run training first".into())
        })?;

        let series = load_price_series(&self.data_path).map_err(|e| match e {
            ForecastError::DataUnavailable(_) => e,
            ForecastError::InsufficientHistory { available, .. } => {
                ForecastError::insufficient(available)
            }
            other => ForecastError::DataUnavailable(other.to_string()),
        })?;

        let (feature_date, features) = build_next(&series).map_err(into_prediction_error)?;
        let raw = bundle.predict(&features).map_err(into_prediction_error)?;
        if !raw.is_finite() {
            return Err(ForecastError::PredictionFailed(format!(
                "model returned a non-finite value ({raw})"
            )));
        }

        let now = self.now();
        let target_date = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ForecastError::PredictionFailed("calendar overflow".into()))?;
        if feature_date != target_date {
            tracing::warn!(
                %feature_date,
                %target_date,
                "Price series is not current; features describe the day after its last observation"
            );
        }

        let result = PredictionResult {
            target_date,
            predicted_price: round4(raw),
            currency: CURRENCY.to_string(),
            unit: UNIT.to_string(),
            confidence: self.confidence,
            generated_at: now,
        };
        tracing::info!(
            target = %result.target_date,
            price = result.predicted_price,
            "Prediction served"
        );
        Ok(result)
    }

    fn now(&self) -> chrono::DateTime<chrono::FixedOffset> {
        let now = self.clock.now();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Keep the service-level kinds; everything else becomes `PredictionFailed`
fn into_prediction_error(e: ForecastError) -> ForecastError {
    match e {
        ForecastError::InsufficientHistory { .. }
        | ForecastError::ModelUnavailable(_)
        | ForecastError::DataUnavailable(_)
        | ForecastError::PredictionFailed(_) => e,
        other => ForecastError::PredictionFailed(other.to_string()),
    }
}
