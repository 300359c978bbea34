//! Offline training pipeline
//!
//! ```text
//! PriceSeries → TrainingSet → split (fit | last N days) → fit → evaluate
//!                           → refit on everything → ModelBundle → disk
//! ```
//!
//! The split is chronological. Nothing is written unless every step succeeds.

mod metrics;

pub use metrics::{mean_absolute_error, mean_absolute_percentage_error, EvaluationMetrics};

use crate::data::PriceSeries;
use crate::dataset::TrainingSet;
use crate::error::{ForecastError, Result, MIN_HISTORY_DAYS};
use crate::model::{predict_all, BundleMetadata, LastValueRegressor, ModelBundle, Regressor};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::Path;

/// Summary of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub model_name: String,
    pub total_examples: usize,
    pub fit_examples: usize,
    pub eval_examples: usize,
    /// Last label date in the fit window
    pub fit_end: NaiveDate,
    /// First and last label dates in the evaluation window
    pub eval_start: NaiveDate,
    pub eval_end: NaiveDate,
    pub metrics: EvaluationMetrics,
}

pub struct TrainingPipeline<M: Regressor> {
    model: M,
    holdout_days: u32,
}

impl<M: Regressor> TrainingPipeline<M> {
    pub fn new(model: M, holdout_days: u32) -> Self {
        Self {
            model,
            holdout_days,
        }
    }

    /// Run every step up to, but not including, persistence
    pub fn run(mut self, series: &PriceSeries) -> Result<(ModelBundle<M>, TrainingReport)> {
        if self.holdout_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "holdout window must be at least one day".into(),
            ));
        }

        let set = TrainingSet::from_series(series)?;
        let (fit, eval) = set.split_holdout(self.holdout_days);
        let (Some(fit_end), Some(eval_start), Some(eval_end)) =
            (fit.last_date(), eval.first_date(), eval.last_date())
        else {
            return Err(ForecastError::InsufficientHistory {
                required: MIN_HISTORY_DAYS + self.holdout_days as usize + 1,
                available: series.len(),
            });
        };

        tracing::info!(
            model = self.model.name(),
            fit = fit.len(),
            eval = eval.len(),
            %fit_end,
            "Training on fit window"
        );
        let metrics = self.evaluate(&fit, &eval)?;
        tracing::info!(
            mae = metrics.mae,
            mape_pct = metrics.mape_pct,
            baseline_mae = metrics.baseline_mae,
            "Held-out evaluation"
        );

        // Deployed model sees the full history
        let table = set.feature_table();
        self.model.fit(&table, &set.targets())?;
        tracing::info!(rows = set.len(), "Refitted on full history");

        let report = TrainingReport {
            model_name: self.model.name().to_string(),
            total_examples: set.len(),
            fit_examples: fit.len(),
            eval_examples: eval.len(),
            fit_end,
            eval_start,
            eval_end,
            metrics,
        };
        let metadata = BundleMetadata {
            model_name: report.model_name.clone(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_rows: set.len(),
            evaluation: Some(metrics),
        };

        Ok((ModelBundle::new(self.model, table.names, metadata), report))
    }

    /// Fit on `fit`, score on `eval`
    fn evaluate(&mut self, fit: &TrainingSet, eval: &TrainingSet) -> Result<EvaluationMetrics> {
        let fit_table = fit.feature_table();
        self.model.fit(&fit_table, &fit.targets())?;

        let eval_table = eval.feature_table();
        let actual = eval.targets();
        let predicted = predict_all(&self.model, &eval_table)?;

        let mut baseline = LastValueRegressor::new();
        baseline.fit(&fit_table, &fit.targets())?;
        let naive = predict_all(&baseline, &eval_table)?;

        Ok(EvaluationMetrics {
            mae: mean_absolute_error(&actual, &predicted)?,
            mape_pct: mean_absolute_percentage_error(&actual, &predicted)? * 100.0,
            baseline_mae: mean_absolute_error(&actual, &naive)?,
            samples: actual.len(),
        })
    }
}

/// Train and persist. A failure at any step leaves `path` untouched.
pub fn train_and_save<M, P>(
    pipeline: TrainingPipeline<M>,
    series: &PriceSeries,
    path: P,
) -> Result<TrainingReport>
where
    M: Regressor + Serialize,
    P: AsRef<Path>,
{
    let (bundle, report) = pipeline.run(series)?;
    bundle.save(path)?;
    Ok(report)
}
