//! Error → HTTP response mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use clearbill_auth::DenyReason;
use clearbill_core::DomainError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 when no scheme verified the caller, 403 when a policy said no.
pub fn deny_response(reason: &DenyReason) -> axum::response::Response {
    if reason.is_unauthenticated() {
        json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason.to_string())
    } else {
        json_error(StatusCode::FORBIDDEN, "forbidden", reason.to_string())
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}
