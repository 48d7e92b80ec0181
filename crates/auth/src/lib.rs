//! `clearbill-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: verifiers take
//! raw header values and return claim sets, the policy engine takes claim sets
//! and returns decisions, and the request identity context is a plain value
//! the hosting layer injects per request.

pub mod basic;
pub mod bearer;
pub mod claims;
pub mod context;
pub mod error;
pub mod policy;
pub mod schemes;
pub mod store;
pub mod token;

pub use basic::BasicVerifier;
pub use bearer::{
    AsymmetricBearerVerifier, CachedKeyProvider, IssuerKeyProvider, StaticKeyProvider,
    SymmetricBearerVerifier,
};
pub use claims::{Claim, ClaimKind, ClaimSet, Permission, Role};
pub use context::{RequestPrincipal, UserContext};
pub use error::{AuthError, AuthResult};
pub use policy::{
    AuthorizationEngine, AuthorizationPolicy, Decision, DenyReason, PolicyRegistry,
    PolicySelector, Requirement,
};
pub use schemes::AuthScheme;
pub use store::{CredentialStore, Identity};
pub use token::{SigningConfig, TokenIssuer};
