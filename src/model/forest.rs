//! Random forest regressor

use super::tree::{RegressionTree, TreeConfig};
use super::{FeatureTable, Regressor};
use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree (None = unlimited)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 400,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl From<&ModelConfig> for ForestConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
            seed: config.seed,
            ..Default::default()
        }
    }
}

/// Bagged ensemble of regression trees; prediction is the mean over trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature names with importances, most important first
    pub fn feature_importance_ranking(&self) -> Vec<(&str, f64)> {
        let mut ranking: Vec<(&str, f64)> = self
            .feature_names
            .iter()
            .zip(self.feature_importances.iter())
            .map(|(n, &i)| (n.as_str(), i))
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    fn grow_tree(&self, table: &FeatureTable, targets: &[f64], index: usize) -> Result<RegressionTree> {
        let seed = self.config.seed.wrapping_add(index as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = table.n_samples();

        let sample: Vec<usize> = if self.config.bootstrap {
            (0..n).map(|_| rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };

        let mut tree = RegressionTree::new(TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: self.config.max_features,
        });
        tree.fit_indices(&table.rows, targets, sample, &mut rng)?;
        Ok(tree)
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, table: &FeatureTable, targets: &[f64]) -> Result<()> {
        table.validate(targets)?;
        if self.config.n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "forest needs at least one tree".into(),
            ));
        }

        // Each tree owns its seed, so the result does not depend on thread scheduling
        let trees = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| self.grow_tree(table, targets, i))
            .collect::<Result<Vec<_>>>()?;

        let n_features = table.n_features();
        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (total, &imp) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }

        self.trees = trees;
        self.feature_names = table.names.clone();
        self.feature_importances = importances;

        tracing::debug!(
            trees = self.trees.len(),
            samples = table.n_samples(),
            features = n_features,
            "Random forest fitted"
        );
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if !self.is_fitted() {
            return Err(ForecastError::PredictionFailed(
                "random forest has not been fitted".into(),
            ));
        }
        if features.len() != self.feature_names.len() {
            return Err(ForecastError::PredictionFailed(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }
        if let Some(bad) = features.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::PredictionFailed(format!(
                "non-finite feature value {bad}"
            )));
        }

        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_one(features)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        "random_forest"
    }

    fn check_integrity(&self, n_features: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(ForecastError::ModelUnavailable(
                "random forest has no trees".into(),
            ));
        }
        if self.feature_names.len() != n_features {
            return Err(ForecastError::ModelUnavailable(format!(
                "forest was fitted on {} features, bundle lists {}",
                self.feature_names.len(),
                n_features
            )));
        }
        for tree in &self.trees {
            tree.validate(n_features)?;
        }
        Ok(())
    }
}
