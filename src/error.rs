use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::schema::ValidationIssues;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid payload.")]
    Validation(ValidationIssues),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationIssues> for AppError {
    fn from(issues: ValidationIssues) -> Self {
        AppError::Validation(issues)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(issues) => {
                tracing::debug!("Rejected request: {:?}", issues);
                let body = Json(json!({
                    "error": "Invalid payload.",
                    "details": issues,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            AppError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                let body = Json(json!({ "error": e.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
