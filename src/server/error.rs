//! Error types for the HTTP surface

use crate::models::InferenceError;
use crate::schema::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const MODEL_UNAVAILABLE_DETAIL: &str = "Model not loaded or initialization error.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable(reason) => ApiError::ModelUnavailable(reason),
            other => ApiError::Inference(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::to_value(&errors).unwrap_or_else(|_| json!([])),
            ),
            ApiError::ModelUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!(MODEL_UNAVAILABLE_DETAIL),
            ),
            ApiError::Inference(msg) => {
                tracing::error!(detail = %msg, "Prediction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!("Prediction failed."))
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!("Not Found")),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, json!("Method Not Allowed"))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
