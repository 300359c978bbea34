//! Steel Rebar Price Forecaster
//!
//! Next-day price forecasts for steel rebar (USD per metric ton) from a daily
//! price history, served over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! CSV feed → Normalizer (daily, forward-filled) → Feature Builder
//!                                                      ↓
//!          Training Pipeline (split → fit → evaluate → refit) → ModelBundle (disk)
//!                                                                    ↓
//!                                   Prediction Service (Clock) → HTTP API
//! ```

pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod server;
pub mod service;
pub mod training;
pub mod types;
