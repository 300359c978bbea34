//! Configuration management
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file,
//! `REBAR__SECTION__KEY` environment variables, then the two direct overrides
//! `MODEL_PATH` and `DATA_CSV`.

use crate::error::{ForecastError, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Daily price feed (`date,price_usd_per_ton`)
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    /// Where `features` writes the engineered table
    #[serde(default = "default_features_csv")]
    pub features_csv: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Persisted model bundle
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    /// Unlimited when unset
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// All features when unset
    #[serde(default)]
    pub max_features: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Trailing calendar days held out for evaluation
    #[serde(default = "default_test_days")]
    pub test_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Fixed local offset used for "tomorrow" and response timestamps (Monterrey = -360)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Placeholder confidence reported with every prediction
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_csv_path() -> PathBuf {
    PathBuf::from("steel_rebar_prices.csv")
}
fn default_features_csv() -> PathBuf {
    PathBuf::from("steel_rebar_features.csv")
}
fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}
fn default_n_trees() -> usize {
    400
}
fn default_min_samples_split() -> usize {
    2
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_seed() -> u64 {
    42
}
fn default_test_days() -> u32 {
    180
}
fn default_utc_offset_minutes() -> i32 {
    -360
}
fn default_confidence() -> f64 {
    0.80
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            features_csv: default_features_csv(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            n_trees: default_n_trees(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: None,
            seed: default_seed(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_days: default_test_days(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            confidence: default_confidence(),
        }
    }
}

impl ServiceConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("REBAR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("model.path", std::env::var("MODEL_PATH").ok())?
            .set_override_option("data.csv_path", std::env::var("DATA_CSV").ok())?
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "model.n_trees must be positive".into(),
            ));
        }
        if self.model.min_samples_leaf == 0 || self.model.min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(
                "model.min_samples_leaf must be >= 1 and model.min_samples_split >= 2".into(),
            ));
        }
        if self.model.max_features == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "model.max_features must be positive when set".into(),
            ));
        }
        if self.training.test_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "training.test_days must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.service.confidence) {
            return Err(ForecastError::InvalidParameter(format!(
                "service.confidence must be within [0, 1], got {}",
                self.service.confidence
            )));
        }
        self.service.utc_offset()?;
        Ok(())
    }
}
