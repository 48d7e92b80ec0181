//! Request middleware: execution context + the authentication/authorization
//! guard.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use clearbill_auth::{AuthorizationEngine, Decision, UserContext};

use crate::app::errors;
use crate::app::policies::{RouteAccess, RoutePolicies};
use crate::context::ExecutionContext;

/// Populate the per-request [`ExecutionContext`] from inbound headers.
pub async fn context_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let context = ExecutionContext::new(request_id);
    tracing::debug!(
        method = %req.method(),
        path = req.uri().path(),
        request_id = %context.request_id(),
        "handling request"
    );
    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Shared state for the authentication guard.
#[derive(Clone)]
pub struct AuthState {
    pub engine: Arc<AuthorizationEngine>,
    pub routes: Arc<RoutePolicies>,
}

/// Authenticate and authorize the request according to the route policy
/// table, then expose the verified identity to handlers.
///
/// Allowed requests carry two extensions downstream: the full
/// `RequestPrincipal` (raw claims for finer-grained checks) and the
/// `UserContext` business collaborators depend on.
pub async fn authentication_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let access = {
        let matched = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        state.routes.access(req.method(), &matched)
    };

    let selector = match access {
        RouteAccess::Anonymous => {
            req.extensions_mut().insert(UserContext::anonymous());
            return next.run(req).await;
        }
        RouteAccess::Guarded(selector) => selector,
    };

    let decision = {
        let header_values: Vec<&str> = req
            .headers()
            .get_all(AUTHORIZATION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        state.engine.authorize(&header_values, &selector)
    };

    match decision {
        Decision::Allow(principal) => {
            req.extensions_mut().insert(principal.context().clone());
            req.extensions_mut().insert(Arc::new(principal));
            next.run(req).await
        }
        Decision::Deny(reason) => {
            tracing::debug!(%reason, "request denied");
            errors::deny_response(&reason)
        }
    }
}
