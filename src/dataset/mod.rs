//! Labeled training data built by replaying the feature builder over history


use crate::data::{PriceSeries, DATE_COLUMN, PRICE_COLUMN};
use crate::error::{Result, MIN_HISTORY_DAYS};
use crate::features::build_features;
use crate::model::FeatureTable;
use crate::types::{FeatureVector, FEATURE_NAMES};
use chrono::{Days, NaiveDate};
use std::path::Path;

/// Feature vector for `date` paired with the price realized on `date`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub target: f64,
}

/// Chronologically ordered training examples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    examples: Vec<TrainingExample>,
}

impl TrainingSet {
    /// One example per date with at least 30 strictly earlier days.
    ///
    /// Example order follows the calendar, which the time-based split relies on.
    pub fn from_series(series: &PriceSeries) -> Result<Self> {
        let mut examples = Vec::with_capacity(series.len().saturating_sub(MIN_HISTORY_DAYS));
        for (date, target) in series.iter().skip(MIN_HISTORY_DAYS) {
            let features = build_features(series, date)?;
            examples.push(TrainingExample {
                date,
                features,
                target,
            });
        }

        tracing::debug!(
            examples = examples.len(),
            days = series.len(),
            "Built training set"
        );
        Ok(Self { examples })
    }

    pub fn from_examples(examples: Vec<TrainingExample>) -> Self {
        Self { examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.examples.first().map(|e| e.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.examples.last().map(|e| e.date)
    }

    /// Split into (fit, eval) where eval holds labels dated after
    /// `last_date - holdout_days`. Order is preserved and nothing is shuffled.
    pub fn split_holdout(&self, holdout_days: u32) -> (TrainingSet, TrainingSet) {
        let Some(cutoff) = self
            .last_date()
            .and_then(|last| last.checked_sub_days(Days::new(holdout_days as u64)))
        else {
            return (self.clone(), TrainingSet::default());
        };

        let split_at = self.examples.partition_point(|e| e.date <= cutoff);
        let (fit, eval) = self.examples.split_at(split_at);
        (
            TrainingSet::from_examples(fit.to_vec()),
            TrainingSet::from_examples(eval.to_vec()),
        )
    }

    /// Feature matrix in canonical column order
    pub fn feature_table(&self) -> FeatureTable {
        FeatureTable {
            names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            rows: self.examples.iter().map(|e| e.features.to_vec()).collect(),
        }
    }

    pub fn targets(&self) -> Vec<f64> {
        self.examples.iter().map(|e| e.target).collect()
    }

    /// Export `date, price_usd_per_ton, <features>` for offline inspection
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![DATE_COLUMN, PRICE_COLUMN];
        header.extend(FEATURE_NAMES);
        writer.write_record(&header)?;

        for example in &self.examples {
            let mut record = vec![example.date.to_string(), example.target.to_string()];
            record.extend(example.features.to_vec().iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
