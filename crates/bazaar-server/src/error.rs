//! HTTP mapping for core errors
//!
//! Validation -> 400, invalid transition -> 400, conflict -> 409,
//! not found -> 404, suspended tenant -> 503, archived tenant -> 410.
//! Everything else is logged and surfaced as a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use bazaar_core::Error;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self.0 {
            Error::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                Some(field.clone()),
            ),
            Error::InvalidTransition { from, to } => (
                StatusCode::BAD_REQUEST,
                "invalid_transition",
                format!("cannot transition from {} to {}", from, to),
                None,
            ),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Error::InvalidTenant(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_tenant", msg.clone(), None)
            }
            Error::TenantSuspended(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "tenant_suspended",
                "This store is temporarily unavailable".to_string(),
                None,
            ),
            Error::TenantArchived(_) => (
                StatusCode::GONE,
                "tenant_archived",
                "This store is no longer available".to_string(),
                None,
            ),
            other => {
                error!(error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        if let Some(field) = field {
            body["error"]["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
