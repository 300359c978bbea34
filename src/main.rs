//! Steel Rebar Price Forecaster
//!
//! Trains the next-day price model and serves predictions over HTTP.

use clap::{Parser, Subcommand};
use rebar_forecast::{
    config::Config,
    data::load_price_series,
    dataset::TrainingSet,
    model::{ModelBundle, RandomForestRegressor},
    server::start_server,
    service::{LocalClock, PredictionService},
    training::{train_and_save, TrainingPipeline},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rebar-forecast")]
#[command(about = "Next-day steel rebar price forecasting service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP prediction API
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Train the forest, report held-out error and write the bundle
    Train,
    /// Write the engineered feature table as CSV
    Features {
        /// Output path (defaults to data.features_csv)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print tomorrow's prediction as JSON
    Predict,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Train => train(config).await,
        Commands::Features { output } => write_features(config, output),
        Commands::Predict => predict_once(config),
    }
}

fn build_service(
    config: &Config,
    bundle: Option<ModelBundle<RandomForestRegressor>>,
) -> anyhow::Result<PredictionService> {
    let clock = Arc::new(LocalClock::new(config.service.utc_offset()?));
    Ok(PredictionService::new(bundle, &config.data.csv_path, clock)
        .with_confidence(config.service.confidence))
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let bundle = ModelBundle::load_optional(&config.model.path);
    let service = Arc::new(build_service(&config, bundle)?);
    let port = port.unwrap_or(config.server.port);
    start_server(service, &config.server.host, port).await?;
    Ok(())
}

async fn train(config: Config) -> anyhow::Result<()> {
    tracing::info!(csv = %config.data.csv_path.display(), "Loading price history");
    let series = load_price_series(&config.data.csv_path)?;

    let model = RandomForestRegressor::new((&config.model).into());
    let pipeline = TrainingPipeline::new(model, config.training.test_days);
    let model_path = config.model.path.clone();

    // Tree growth is CPU bound
    let report = tokio::task::spawn_blocking(move || {
        train_and_save(pipeline, &series, &model_path)
    })
    .await??;

    println!("Model: {}", report.model_name);
    println!(
        "Examples: {} (fit {} through {}, evaluate {} from {} to {})",
        report.total_examples,
        report.fit_examples,
        report.fit_end,
        report.eval_examples,
        report.eval_start,
        report.eval_end
    );
    println!("MAE: {:.4}", report.metrics.mae);
    println!("MAPE: {:.2}%", report.metrics.mape_pct);
    println!("Persistence baseline MAE: {:.4}", report.metrics.baseline_mae);

    // Read back what was written
    let bundle: ModelBundle<RandomForestRegressor> = ModelBundle::load(&config.model.path)?;
    println!("Feature importances:");
    for (name, weight) in bundle.model.feature_importance_ranking() {
        println!("  {:<16} {:.4}", name, weight);
    }
    Ok(())
}

fn write_features(config: Config, output: Option<String>) -> anyhow::Result<()> {
    let series = load_price_series(&config.data.csv_path)?;
    let set = TrainingSet::from_series(&series)?;

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data.features_csv.clone());
    set.write_csv(&path)?;

    tracing::info!(rows = set.len(), path = %path.display(), "Feature table written");
    Ok(())
}

fn predict_once(config: Config) -> anyhow::Result<()> {
    let bundle: ModelBundle<RandomForestRegressor> = ModelBundle::load(&config.model.path)?;
    let service = build_service(&config, Some(bundle))?;

    let prediction = service.predict()?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
