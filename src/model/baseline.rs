//! Persistence baseline: tomorrow's price equals today's

use super::{FeatureTable, Regressor};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

const LAG_1: &str = "lag_1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LastValueRegressor {
    lag_index: Option<usize>,
}

impl LastValueRegressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LastValueRegressor {
    fn fit(&mut self, table: &FeatureTable, targets: &[f64]) -> Result<()> {
        table.validate(targets)?;
        let idx = table.column_index(LAG_1).ok_or_else(|| {
            ForecastError::InvalidParameter(format!("feature table has no '{LAG_1}' column"))
        })?;
        self.lag_index = Some(idx);
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        let idx = self.lag_index.ok_or_else(|| {
            ForecastError::PredictionFailed("baseline has not been fitted".into())
        })?;
        features.get(idx).copied().ok_or_else(|| {
            ForecastError::PredictionFailed(format!("missing '{LAG_1}' at column {idx}"))
        })
    }

    fn name(&self) -> &str {
        "last_value"
    }

    fn check_integrity(&self, n_features: usize) -> Result<()> {
        match self.lag_index {
            Some(idx) if idx < n_features => Ok(()),
            Some(idx) => Err(ForecastError::ModelUnavailable(format!(
                "'{LAG_1}' column {idx} is outside {n_features} features"
            ))),
            None => Err(ForecastError::ModelUnavailable(
                "baseline has not been fitted".into(),
            )),
        }
    }
}
