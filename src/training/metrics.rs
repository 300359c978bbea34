//! Forecast accuracy metrics

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Held-out accuracy of a fitted model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvaluationMetrics {
    /// Mean absolute error, USD per metric ton
    pub mae: f64,
    /// Mean absolute percentage error, in percent
    pub mape_pct: f64,
    /// MAE of the "tomorrow equals today" baseline on the same rows
    pub baseline_mae: f64,
    pub samples: usize,
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "metrics need equal non-zero lengths, got {} actual and {} predicted",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(total / actual.len() as f64)
}

/// Mean of |a - p| / |a| as a fraction. Zero actuals are an error.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    if actual.iter().any(|&a| a == 0.0) {
        return Err(ForecastError::InvalidParameter(
            "MAPE is undefined for zero actual values".into(),
        ));
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    Ok(total / actual.len() as f64)
}
