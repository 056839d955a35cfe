use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::plan::PlanError;
use crate::plan::approvals::ApprovalError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Conflict(String),
    Gone(String),
    Internal(String),
    Validation(Vec<String>),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Gone(msg) => (StatusCode::GONE, json!({ "error": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "valid": false, "errors": errors }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", err))
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        let msg = err.to_string();
        match err {
            PlanError::InvalidStrategy(errors) => {
                ApiError::Validation(errors.iter().map(|e| e.to_string()).collect())
            }
            PlanError::Incompatible(items) => {
                ApiError::Validation(items.into_iter().map(|i| i.reason).collect())
            }
            PlanError::Superseded => ApiError::Conflict(msg),
            PlanError::InputMismatch { .. } | PlanError::ZeroAmount | PlanError::Encode(_) => {
                ApiError::BadRequest(msg)
            }
        }
    }
}

impl From<ApprovalError> for ApiError {
    fn from(err: ApprovalError) -> Self {
        match &err {
            ApprovalError::PlanExpired { .. } => ApiError::Gone(err.to_string()),
        }
    }
}
