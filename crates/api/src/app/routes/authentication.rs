//! Token issuance and identity introspection.
//!
//! The token endpoint exists because this demo keeps its own credential
//! store; a production deployment would obtain tokens from a dedicated
//! identity provider instead.

use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use clearbill_auth::{RequestPrincipal, UserContext};

use crate::app::{AppServices, dto, errors};

/// `POST /api/authenticate` — verify a login/password pair and issue a
/// symmetric bearer token for it.
pub async fn authenticate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let claims = match services.store.authenticate(&body.login, &body.password) {
        Ok(claims) => claims,
        Err(err) => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                err.to_string(),
            );
        }
    };

    match services.issuer.issue(&claims) {
        Ok(token) => Json(dto::TokenResponse { token }).into_response(),
        Err(err) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "token_issue_failed",
            err.to_string(),
        ),
    }
}

/// `GET /api/me` — the verified identity for this request.
pub async fn me(
    Extension(principal): Extension<Arc<RequestPrincipal>>,
) -> axum::response::Response {
    Json(dto::MeResponse::from_principal(&principal)).into_response()
}

/// `GET /api/ping` — liveness probe guarded only by the fallback policy, so
/// any authenticated caller reaches it even without identity claims.
pub async fn ping(Extension(identity): Extension<UserContext>) -> axum::response::Response {
    Json(json!({
        "status": "ok",
        "authenticated": identity.is_authenticated(),
        "email": identity.identity_email(),
    }))
    .into_response()
}
