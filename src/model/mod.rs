//! Forecast models
//!
//! Any regression strategy implementing [`Regressor`] can back the training
//! pipeline and the prediction service. The deployed strategy is
//! [`RandomForestRegressor`]; [`LastValueRegressor`] is the persistence
//! baseline it is benchmarked against.

mod baseline;
mod bundle;
mod forest;
mod tree;
#[cfg(test)]
mod tests;

pub use baseline::LastValueRegressor;
pub use bundle::{BundleMetadata, ModelBundle};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use tree::{RegressionTree, TreeConfig};

use crate::error::{ForecastError, Result};

/// Column-named feature matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Shape checks shared by every strategy's `fit`
    pub fn validate(&self, targets: &[f64]) -> Result<()> {
        if self.rows.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "cannot fit on an empty feature table".into(),
            ));
        }
        if self.rows.len() != targets.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                self.rows.len(),
                targets.len()
            )));
        }
        if let Some(row) = self.rows.iter().find(|r| r.len() != self.names.len()) {
            return Err(ForecastError::InvalidParameter(format!(
                "row has {} values, expected {}",
                row.len(),
                self.names.len()
            )));
        }
        Ok(())
    }
}

/// Regression strategy
pub trait Regressor: Send + Sync {
    /// Train on `table`, replacing any previous state
    fn fit(&mut self, table: &FeatureTable, targets: &[f64]) -> Result<()>;

    /// Predict one row laid out like the table passed to `fit`
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Strategy name for logs and bundle metadata
    fn name(&self) -> &str;

    /// Reject deserialized state that cannot serve `n_features`-wide rows
    fn check_integrity(&self, _n_features: usize) -> Result<()> {
        Ok(())
    }
}

/// Predict every row of `table`
pub fn predict_all<M: Regressor + ?Sized>(model: &M, table: &FeatureTable) -> Result<Vec<f64>> {
    table.rows.iter().map(|row| model.predict(row)).collect()
}
