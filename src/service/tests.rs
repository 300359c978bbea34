//! Tests for the prediction service

use super::*;
use crate::model::{BundleMetadata, FeatureTable, LastValueRegressor};
use crate::types::FEATURE_NAMES;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::io::Write;
use std::path::Path;

fn monterrey() -> FixedOffset {
    FixedOffset::west_opt(6 * 3600).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
    monterrey().with_ymd_and_hms(y, m, d, h, 15, 30).unwrap()
}

fn fixed_clock(now: DateTime<FixedOffset>) -> Arc<dyn Clock> {
    Arc::new(FixedClock(now))
}

/// Consecutive daily prices starting at `first`
fn write_prices(path: &Path, first: NaiveDate, prices: &[f64]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "date,price_usd_per_ton").unwrap();
    for (i, price) in prices.iter().enumerate() {
        let date = first + Days::new(i as u64);
        writeln!(file, "{},{}", date, price).unwrap();
    }
}

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

fn baseline_bundle() -> ModelBundle<LastValueRegressor> {
    let names: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
    let table = FeatureTable {
        names: names.clone(),
        rows: vec![vec![0.0; names.len()]],
    };
    let mut model = LastValueRegressor::new();
    model.fit(&table, &[0.0]).unwrap();
    ModelBundle::new(
        model,
        names,
        BundleMetadata {
            model_name: "last_value".into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            trained_at: Utc::now(),
            training_rows: 1,
            evaluation: None,
        },
    )
}

/// Always returns the same price
struct ConstantRegressor(f64);

impl Regressor for ConstantRegressor {
    fn fit(&mut self, _table: &FeatureTable, _targets: &[f64]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

fn constant_bundle(value: f64) -> ModelBundle<ConstantRegressor> {
    let mut bundle = baseline_bundle();
    bundle.metadata.model_name = "constant".into();
    ModelBundle::new(ConstantRegressor(value), bundle.features, bundle.metadata)
}

#[test]
fn test_predict_forty_day_ramp() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    let first = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
    // Day 40 is 2026-10-15; the clock says 2026-10-15 local
    write_prices(&csv, first, &ramp(40));

    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(at(2026, 10, 15, 9)),
    );
    let result = service.predict().unwrap();

    assert_eq!(result.target_date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    // Persistence baseline returns lag_1, which is the last ramp value
    assert_eq!(result.predicted_price, 139.0);
    assert_eq!(result.currency, "USD");
    assert_eq!(result.unit, "metric_ton");
    assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    assert_eq!(result.generated_at, at(2026, 10, 15, 9));
}

#[test]
fn test_predict_rounds_to_four_decimals() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(35));

    let service = PredictionService::new(
        Some(constant_bundle(612.345678)),
        &csv,
        fixed_clock(at(2026, 2, 4, 12)),
    )
    .with_confidence(0.65);
    let result = service.predict().unwrap();
    assert_eq!(result.predicted_price, 612.3457);
    assert_eq!(result.confidence, 0.65);
}

#[test]
fn test_tomorrow_follows_clock_not_series() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    // Series ends 2026-03-06, two weeks before "today"
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(), &ramp(34));

    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(at(2026, 3, 20, 23)),
    );
    let result = service.predict().unwrap();
    assert_eq!(result.target_date, NaiveDate::from_ymd_opt(2026, 3, 21).unwrap());
    assert_eq!(result.predicted_price, 133.0);
}

#[test]
fn test_tomorrow_uses_local_offset() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(40));

    // 03:00 UTC on the 11th is still the 10th in Monterrey
    let utc = Utc.with_ymd_and_hms(2026, 2, 11, 3, 0, 0).unwrap();
    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(utc.with_timezone(&monterrey())),
    );
    let result = service.predict().unwrap();
    assert_eq!(result.target_date, NaiveDate::from_ymd_opt(2026, 2, 11).unwrap());
}

#[test]
fn test_predict_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(40));

    let service: PredictionService<LastValueRegressor> =
        PredictionService::new(None, &csv, fixed_clock(at(2026, 2, 10, 8)));
    assert!(!service.model_loaded());
    assert_eq!(service.predict().unwrap_err().kind(), "model_unavailable");
}

#[test]
fn test_predict_missing_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = PredictionService::new(
        Some(baseline_bundle()),
        dir.path().join("absent.csv"),
        fixed_clock(at(2026, 2, 10, 8)),
    );
    assert_eq!(service.predict().unwrap_err().kind(), "data_unavailable");
}

#[test]
fn test_predict_malformed_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    std::fs::write(&csv, "day,close\n2026-01-01,1.0\n").unwrap();

    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(at(2026, 2, 10, 8)),
    );
    let err = service.predict().unwrap_err();
    assert_eq!(err.kind(), "data_unavailable");
    assert!(err.to_string().contains("price_usd_per_ton"));
}

#[test]
fn test_predict_short_history() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(29));

    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(at(2026, 1, 29, 8)),
    );
    match service.predict().unwrap_err() {
        ForecastError::InsufficientHistory { required, available } => {
            assert_eq!(required, 30);
            assert_eq!(available, 29);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    std::fs::write(&csv, "date,price_usd_per_ton\n").unwrap();
    assert_eq!(service.predict().unwrap_err().kind(), "insufficient_history");
}

#[test]
fn test_predict_wraps_model_failures() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(40));

    let mut bundle = constant_bundle(1.0);
    bundle.features.push("lag_365".into());
    let service = PredictionService::new(Some(bundle), &csv, fixed_clock(at(2026, 2, 10, 8)));
    assert_eq!(service.predict().unwrap_err().kind(), "prediction_failed");

    let service = PredictionService::new(
        Some(constant_bundle(f64::INFINITY)),
        &csv,
        fixed_clock(at(2026, 2, 10, 8)),
    );
    assert_eq!(service.predict().unwrap_err().kind(), "prediction_failed");
}

#[test]
fn test_health_reports_state() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");

    let mut clock = MockClock::new();
    clock.expect_now().returning(|| at(2026, 10, 16, 10));
    let service: PredictionService<LastValueRegressor> =
        PredictionService::new(None, &csv, Arc::new(clock));

    let health = service.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert!(!health.model_loaded);
    assert_eq!(health.model_features, None);
    assert!(!health.data_exists);
    assert_eq!(health.server_time, "2026-10-16T10:15:30-06:00");

    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(3));
    let service = PredictionService::new(
        Some(baseline_bundle()),
        &csv,
        fixed_clock(at(2026, 10, 16, 10)),
    );
    let health = service.health();
    assert!(health.model_loaded);
    assert_eq!(health.model_features.unwrap().len(), FEATURE_NAMES.len());
    assert!(health.data_exists);
}

#[test]
fn test_timestamp_drops_subseconds() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("prices.csv");
    write_prices(&csv, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &ramp(40));

    let precise = at(2026, 2, 10, 8).with_nanosecond(123_456_789).unwrap();
    let service = PredictionService::new(Some(baseline_bundle()), &csv, fixed_clock(precise));
    let result = service.predict().unwrap();
    assert_eq!(result.generated_at, at(2026, 2, 10, 8));
}
