//! Data-driven authorization tables.
//!
//! Requirement definitions live here, decoupled from handler declarations:
//! the registry maps policy names to requirement lists, and the route table
//! maps endpoints to policy selectors. Both are built once at startup.

use axum::http::Method;

use clearbill_auth::{
    AuthorizationPolicy, Permission, PolicyRegistry, PolicySelector, Requirement, Role,
};

/// Named policies available to the route table.
pub fn policy_registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new();

    registry.register(
        AuthorizationPolicy::new("invoices.read").require(Requirement::PermissionAny(vec![
            Permission::new("Invoices.Read"),
        ])),
    );

    registry.register(
        AuthorizationPolicy::new("invoices.modify").require(Requirement::PermissionAny(vec![
            Permission::new("Invoices.Modify"),
        ])),
    );

    // Deleting requires the modify permission AND an adult identity; both
    // requirements must hold.
    registry.register(
        AuthorizationPolicy::new("invoices.delete")
            .require(Requirement::PermissionAny(vec![Permission::new(
                "Invoices.Modify",
            )]))
            .require(Requirement::minimum_age(18)),
    );

    registry.register(
        AuthorizationPolicy::new("dev.resources")
            .require(Requirement::Role(Role::new("Developer")))
            .require(Requirement::PermissionAny(vec![Permission::new(
                "Access.Invoice.Dev.Resources",
            )])),
    );

    registry
}

/// How a route may be accessed.
#[derive(Debug, Clone)]
pub enum RouteAccess {
    /// No verification at all (e.g. the token endpoint).
    Anonymous,
    Guarded(PolicySelector),
}

/// Endpoint → policy selector table consulted by the guard middleware.
///
/// Routes not listed here fall back to requiring any successful
/// authentication (the fallback policy).
#[derive(Debug)]
pub struct RoutePolicies {
    rules: Vec<(Method, &'static str, RouteAccess)>,
}

impl RoutePolicies {
    pub fn new(rules: Vec<(Method, &'static str, RouteAccess)>) -> Self {
        Self { rules }
    }

    pub fn access(&self, method: &Method, matched_path: &str) -> RouteAccess {
        self.rules
            .iter()
            .find(|(m, path, _)| m == method && *path == matched_path)
            .map(|(_, _, access)| access.clone())
            .unwrap_or(RouteAccess::Guarded(PolicySelector::Fallback))
    }
}

/// The demo API's route table.
pub fn route_policies() -> RoutePolicies {
    use RouteAccess::{Anonymous, Guarded};

    RoutePolicies::new(vec![
        (Method::POST, "/api/authenticate", Anonymous),
        // Generic authenticated marker: default policy (identity required).
        (
            Method::GET,
            "/api/me",
            Guarded(PolicySelector::Authenticated),
        ),
        (
            Method::GET,
            "/api/customers",
            Guarded(PolicySelector::Authenticated),
        ),
        (
            Method::GET,
            "/api/currencies",
            Guarded(PolicySelector::Authenticated),
        ),
        (
            Method::GET,
            "/api/invoices",
            Guarded(PolicySelector::named("invoices.read")),
        ),
        (
            Method::GET,
            "/api/invoices/:id",
            Guarded(PolicySelector::named("invoices.read")),
        ),
        (
            Method::POST,
            "/api/invoices",
            Guarded(PolicySelector::named("invoices.modify")),
        ),
        (
            Method::DELETE,
            "/api/invoices/:id",
            Guarded(PolicySelector::named("invoices.delete")),
        ),
        (
            Method::GET,
            "/api/dev",
            Guarded(PolicySelector::named("dev.resources")),
        ),
        // "/api/ping" is intentionally unlisted: it picks up the fallback
        // policy (any authenticated caller, identity claims not required).
    ])
}
