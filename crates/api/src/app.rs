//! Application wiring: services, policy table, and the router.

use std::sync::Arc;

use axum::{
    Extension, Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;

use clearbill_auth::{
    AsymmetricBearerVerifier, AuthorizationEngine, BasicVerifier, CredentialStore, SigningConfig,
    SymmetricBearerVerifier, TokenIssuer,
};
use clearbill_invoicing::{
    CurrencyDirectory, CustomerDirectory, InMemoryInvoiceRepository, InvoiceService,
    InvoiceServiceConfig,
};

use crate::middleware::{AuthState, authentication_middleware, context_middleware};

pub mod dto;
pub mod errors;
pub mod policies;
pub mod routes;

/// Startup-constructed services shared read-only across requests.
pub struct AppServices {
    pub store: Arc<CredentialStore>,
    pub issuer: Arc<TokenIssuer>,
    pub invoices: InvoiceService,
}

/// Build the full application router.
///
/// All shared state is constructed here and injected explicitly; nothing is
/// process-global. `external` is the optional asymmetric-bearer collaborator
/// (an external issuer's key-backed validator).
pub fn build_app(config: SigningConfig, external: Option<AsymmetricBearerVerifier>) -> Router {
    let store = Arc::new(CredentialStore::with_demo_identities());
    let issuer = Arc::new(TokenIssuer::new(config));

    let mut engine = AuthorizationEngine::new(
        BasicVerifier::new(store.clone()),
        SymmetricBearerVerifier::new(issuer.clone()),
        policies::policy_registry(),
    );
    if let Some(verifier) = external {
        engine = engine.with_asymmetric(verifier);
    }
    let engine = Arc::new(engine);

    let invoices = InvoiceService::new(
        Arc::new(InMemoryInvoiceRepository::new()),
        CustomerDirectory::with_demo_customers(),
        CurrencyDirectory::with_demo_rates(),
        InvoiceServiceConfig::default(),
    );

    let services = Arc::new(AppServices {
        store,
        issuer,
        invoices,
    });

    let auth_state = AuthState {
        engine,
        routes: Arc::new(policies::route_policies()),
    };

    Router::new()
        .route("/api/authenticate", post(routes::authentication::authenticate))
        .route("/api/me", get(routes::authentication::me))
        .route("/api/ping", get(routes::authentication::ping))
        .route("/api/customers", get(routes::directory::customers))
        .route("/api/currencies", get(routes::directory::currencies))
        .route(
            "/api/invoices",
            get(routes::invoices::list).post(routes::invoices::modify),
        )
        .route(
            "/api/invoices/:id",
            get(routes::invoices::get_by_id).delete(routes::invoices::remove),
        )
        .route("/api/dev", get(routes::invoices::dev))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(middleware::from_fn(context_middleware))
                .layer(middleware::from_fn_with_state(
                    auth_state,
                    authentication_middleware,
                )),
        )
}
