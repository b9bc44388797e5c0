//! HTTP request handlers

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::models::InferenceError;
use crate::schema::ValidationErrors;
use crate::types::record::InputRecord;
use crate::types::response::{HealthResponse, PredictionResponse};

use super::error::{ApiError, Result};
use super::state::AppState;

/// Status endpoint. Always succeeds; degraded mode shows as `model_loaded: false`.
pub async fn home(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.service.is_loaded(),
        api_version: state.api_version.clone(),
    })
}

/// Validate the body, run inference and report the class probabilities.
///
/// The body is parsed regardless of `Content-Type`.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResponse>> {
    let start_time = Instant::now();

    let record = match parse_record(&body) {
        Ok(record) => record,
        Err(errors) => {
            state.metrics.record_validation_rejection();
            debug!(errors = errors.len(), detail = %errors, "Request rejected by validation");
            return Err(errors.into());
        }
    };

    let probabilities = state.service.predict(&record).map_err(|e| {
        match &e {
            InferenceError::ModelUnavailable(_) => state.metrics.record_model_unavailable(),
            _ => state.metrics.record_inference_failure(),
        }
        warn!(error = %e, "Prediction refused");
        ApiError::from(e)
    })?;

    let latency = start_time.elapsed();
    state.metrics.record_prediction(latency, probabilities.yes);
    debug!(
        prob_yes = probabilities.yes,
        latency_us = latency.as_micros(),
        "Prediction served"
    );

    Ok(Json(PredictionResponse {
        prediction_probability: probabilities,
        threshold_used: state.threshold,
        description: state.description.clone(),
    }))
}

fn parse_record(body: &[u8]) -> std::result::Result<InputRecord, ValidationErrors> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(ValidationErrors::json_invalid)?;
    InputRecord::from_json(&value)
}

pub async fn handle_404() -> ApiError {
    ApiError::NotFound
}

pub async fn handle_405() -> ApiError {
    ApiError::MethodNotAllowed
}
