//! HTTP API
//!
//! `GET /health` and `GET /predict/steel-rebar-price` over a shared
//! [`PredictionService`].


use crate::error::ForecastError;
use crate::model::Regressor;
use crate::service::PredictionService;
use crate::types::{HealthReport, PredictionResult};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

/// Request-level failure rendered as `{"error": kind, "detail": message}`
#[derive(Debug)]
pub struct ApiError(pub ForecastError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ForecastError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "error": self.0.kind(), "detail": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn health<M: Regressor + 'static>(
    State(service): State<Arc<PredictionService<M>>>,
) -> Json<HealthReport> {
    Json(service.health())
}

async fn predict<M: Regressor + 'static>(
    State(service): State<Arc<PredictionService<M>>>,
) -> Result<Json<PredictionResult>, ApiError> {
    // Reads the CSV and walks every tree
    let result = tokio::task::spawn_blocking(move || service.predict())
        .await
        .map_err(|e| ForecastError::PredictionFailed(format!("prediction task aborted: {e}")))?;

    match result {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            tracing::warn!(kind = e.kind(), "Prediction request failed: {}", e);
            Err(e.into())
        }
    }
}

/// Create the API router
pub fn create_router<M: Regressor + 'static>(service: Arc<PredictionService<M>>) -> Router {
    Router::new()
        .route("/health", get(health::<M>))
        .route("/predict/steel-rebar-price", get(predict::<M>))
        .route("/predict", get(predict::<M>))
        .with_state(service)
}

/// Bind and serve until the process exits
pub async fn start_server<M: Regressor + 'static>(
    service: Arc<PredictionService<M>>,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Forecast API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
