//! Persisted pairing of a trained model and its feature order

use super::Regressor;
use crate::error::{ForecastError, Result};
use crate::training::EvaluationMetrics;
use crate::types::{FeatureVector, FEATURE_NAMES};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleMetadata {
    pub model_name: String,
    pub crate_version: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    /// Held-out metrics from the fit-window model
    pub evaluation: Option<EvaluationMetrics>,
}

/// A trained model plus the exact column order it was fit on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelBundle<M> {
    pub model: M,
    pub features: Vec<String>,
    pub metadata: BundleMetadata,
}

impl<M: Regressor> ModelBundle<M> {
    pub fn new(model: M, features: Vec<String>, metadata: BundleMetadata) -> Self {
        Self {
            model,
            features,
            metadata,
        }
    }

    /// Select columns in bundle order, then predict
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let row = features
            .select(self.features.as_slice())
            .map_err(ForecastError::PredictionFailed)?;
        self.model.predict(&row)
    }
}

impl<M: Regressor> ModelBundle<M> {
    fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(ForecastError::ModelUnavailable(
                "bundle has an empty feature list".into(),
            ));
        }
        if let Some(unknown) = self
            .features
            .iter()
            .find(|f| !FEATURE_NAMES.contains(&f.as_str()))
        {
            return Err(ForecastError::ModelUnavailable(format!(
                "bundle expects unknown feature '{unknown}'"
            )));
        }
        self.model.check_integrity(self.features.len())
    }
}

impl<M: Serialize> ModelBundle<M> {
    /// Write atomically: a sibling temp file is renamed over `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        let json = serde_json::to_vec(self)?;
        if let Err(e) = std::fs::write(&tmp, &json).and_then(|_| std::fs::rename(&tmp, path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(path = %path.display(), bytes = json.len(), "Model bundle saved");
        Ok(())
    }
}

impl<M: Regressor + DeserializeOwned> ModelBundle<M> {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ForecastError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let bundle: Self = serde_json::from_slice(&bytes).map_err(|e| {
            ForecastError::ModelUnavailable(format!("cannot decode {}: {}", path.display(), e))
        })?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Load if present; a missing or unreadable bundle is logged and yields `None`
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Model bundle not found, serving without a model");
            return None;
        }
        match Self::load(path) {
            Ok(bundle) => {
                tracing::info!(
                    path = %path.display(),
                    model = %bundle.metadata.model_name,
                    trained_at = %bundle.metadata.trained_at,
                    "Model bundle loaded"
                );
                Some(bundle)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to load model bundle: {}", e);
                None
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "bundle".into());
    name.push(".tmp");
    path.with_file_name(name)
}
