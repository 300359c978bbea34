//! Feature engineering for next-day forecasting
//!
//! A feature vector for target date `T` is computed only from prices dated
//! strictly before `T`, plus the calendar position of `T` itself:
//! - `lag_k`: price exactly `k` days before `T` (k = 1, 7, 30)
//! - `rolling_mean_w`: mean of the `w` prices ending the day before `T` (w = 7, 30)
//! - `day_of_week` / `month`: weekday (Monday = 0) and month of `T`
//!
//! Windows are never truncated. With fewer than 30 prior days the build fails.


use crate::data::PriceSeries;
use crate::error::{ForecastError, Result, MIN_HISTORY_DAYS};
use crate::types::FeatureVector;
use chrono::{Datelike, Days, NaiveDate};

/// Build the feature vector for `target` from the prices before it
pub fn build_features(series: &PriceSeries, target: NaiveDate) -> Result<FeatureVector> {
    let last = series
        .last_date()
        .ok_or_else(|| ForecastError::insufficient(0))?;

    // No date exists past `NaiveDate::MAX`, so an overflow cannot be exceeded
    let past_end = last
        .checked_add_days(Days::new(1))
        .is_some_and(|next| target > next);
    if past_end {
        return Err(ForecastError::TargetOutOfRange { target, last });
    }

    let available = series.days_before(target);
    if available < MIN_HISTORY_DAYS {
        return Err(ForecastError::insufficient(available));
    }

    // `available` values precede the target; the day before it sits at index available - 1
    let history = &series.values()[..available];

    Ok(FeatureVector {
        lag_1: lag(history, 1),
        lag_7: lag(history, 7),
        lag_30: lag(history, 30),
        rolling_mean_7: trailing_mean(history, 7),
        rolling_mean_30: trailing_mean(history, 30),
        day_of_week: target.weekday().num_days_from_monday(),
        month: target.month(),
    })
}

/// Build the feature vector for the day after the series ends
pub fn build_next(series: &PriceSeries) -> Result<(NaiveDate, FeatureVector)> {
    let last = series
        .last_date()
        .ok_or_else(|| ForecastError::insufficient(0))?;
    let target = last
        .checked_add_days(Days::new(1))
        .ok_or(ForecastError::TargetOutOfRange { target: last, last })?;
    Ok((target, build_features(series, target)?))
}

/// Value `k` steps before the end of `history`; caller guarantees `k <= history.len()`
fn lag(history: &[f64], k: usize) -> f64 {
    history[history.len() - k]
}

/// Mean of the last `w` values; caller guarantees `w <= history.len()`
fn trailing_mean(history: &[f64], w: usize) -> f64 {
    let window = &history[history.len() - w..];
    window.iter().sum::<f64>() / w as f64
}
