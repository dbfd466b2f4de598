//! Gateway-local error type: one `IntoResponse` impl mapping each failure
//! class to its HTTP status and JSON error shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use firewall_types::FirewallError;

pub enum AppError {
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            AppError::Internal(msg) => {
                tracing::error!(target: "firewall-gateway", error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error".to_string(),
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

impl From<FirewallError> for AppError {
    fn from(err: FirewallError) -> Self {
        AppError::Internal(err.to_string())
    }
}
