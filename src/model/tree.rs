//! CART regression tree

use crate::error::{ForecastError, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Regression tree configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeConfig {
    /// Maximum depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Nodes live in a flat arena; children are indices into it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Regression tree minimizing within-node squared error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionTree {
    config: TreeConfig,
    nodes: Vec<Node>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RegressionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Grow the tree on the rows named by `sample` (repeats allowed, as in a bootstrap draw)
    pub fn fit_indices(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        sample: Vec<usize>,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        if sample.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "cannot grow a tree on zero samples".into(),
            ));
        }
        self.n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        self.feature_importances = vec![0.0; self.n_features];
        self.nodes = vec![Node::Leaf { value: 0.0 }];

        // (node slot, samples, depth)
        let mut pending = vec![(0usize, sample, 0usize)];
        while let Some((slot, indices, depth)) = pending.pop() {
            let value = mean(indices.iter().map(|&i| targets[i]));
            let impurity = sse(indices.iter().map(|&i| targets[i]));

            let depth_exhausted = self.config.max_depth.is_some_and(|max| depth >= max);
            if depth_exhausted
                || indices.len() < self.config.min_samples_split
                || impurity <= 1e-12
            {
                self.nodes[slot] = Node::Leaf { value };
                continue;
            }

            match self.find_best_split(rows, targets, &indices, impurity, rng) {
                Some(split) => {
                    self.feature_importances[split.feature] += split.gain;
                    let left = self.nodes.len();
                    let right = left + 1;
                    self.nodes.push(Node::Leaf { value: 0.0 });
                    self.nodes.push(Node::Leaf { value: 0.0 });
                    self.nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    pending.push((left, split.left, depth + 1));
                    pending.push((right, split.right, depth + 1));
                }
                None => self.nodes[slot] = Node::Leaf { value },
            }
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }
        Ok(())
    }

    /// Best variance-reducing split over a random subset of features
    fn find_best_split(
        &self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        parent_sse: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let min_leaf = self.config.min_samples_leaf.max(1);
        let n = indices.len();
        if n < 2 * min_leaf {
            return None;
        }

        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(self.config.max_features.unwrap_or(self.n_features).max(1));

        let total_sum: f64 = indices.iter().map(|&i| targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for &feature in &candidates {
            order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = targets[order[pos]];
                left_sum += y;
                left_sq += y * y;

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = rows[order[pos]][feature];
                let next = rows[order[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let left_sse = left_sq - left_sum * left_sum / n_left as f64;
                let right_sum = total_sum - left_sum;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / n_right as f64;
                let gain = parent_sse - (left_sse.max(0.0) + right_sse.max(0.0));

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    // Midpoint of adjacent floats can round up to `next`
                    let mid = (here + next) / 2.0;
                    let threshold = if mid < next { mid } else { here };
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i][feature] <= threshold);
        Some(BestSplit {
            feature,
            threshold,
            gain,
            left,
            right,
        })
    }

    /// Predict a single row. The walk is bounded by the arena size.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).ok_or_else(|| {
                        ForecastError::PredictionFailed(format!(
                            "split on feature {} but row has {} values",
                            feature,
                            features.len()
                        ))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(ForecastError::PredictionFailed(format!(
            "tree walk left the arena at node {idx}"
        )))
    }

    /// Structural checks for a deserialized tree: children point forward and
    /// stay inside the arena, split features exist.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ForecastError::ModelUnavailable("tree has no nodes".into()));
        }
        if self.n_features != n_features {
            return Err(ForecastError::ModelUnavailable(format!(
                "tree was grown on {} features, model has {}",
                self.n_features, n_features
            )));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(ForecastError::ModelUnavailable(format!(
                        "leaf {idx} holds a non-finite value"
                    )));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let in_arena = |child: usize| child > idx && child < self.nodes.len();
                    if !in_arena(*left) || !in_arena(*right) {
                        return Err(ForecastError::ModelUnavailable(format!(
                            "split {idx} has children {left}/{right} outside {}..{}",
                            idx + 1,
                            self.nodes.len()
                        )));
                    }
                    if *feature >= n_features {
                        return Err(ForecastError::ModelUnavailable(format!(
                            "split {idx} uses feature {feature}, model has {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ForecastError::ModelUnavailable(format!(
                            "split {idx} has a NaN threshold"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Sum of squared deviations from the mean
fn sse(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let m = mean(values.clone());
    values.map(|v| (v - m).powi(2)).sum()
}
