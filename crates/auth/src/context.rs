//! Request-scoped identity.
//!
//! One [`RequestPrincipal`] (and its [`UserContext`]) exists per inbound
//! request. Instances are created by the engine after verification, handed to
//! business collaborators, and discarded at request end; they are never shared
//! across requests.

use crate::claims::{ClaimKind, ClaimSet};
use crate::schemes::AuthScheme;

/// Identity container exposed to business collaborators.
///
/// The caller counts as authenticated iff an email claim is present and
/// non-empty. This single rule is the canonical authentication predicate; the
/// default authorization policy evaluates it through
/// [`UserContext::can_authenticate`] so the two can never diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    authenticated: bool,
    email: String,
}

impl UserContext {
    /// Context for a request that presented no verifiable identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_claims(claims: &ClaimSet) -> Self {
        let mut context = Self::anonymous();
        context.populate(claims);
        context
    }

    /// Derive the identity from a verified claim set.
    pub fn populate(&mut self, claims: &ClaimSet) {
        match claims.first(&ClaimKind::UserEmail) {
            Some(email) if !email.is_empty() => {
                self.authenticated = true;
                self.email = email.to_string();
            }
            _ => {
                self.authenticated = false;
                self.email = String::new();
            }
        }
    }

    /// Whether a claim set would count as an authenticated identity.
    pub fn can_authenticate(claims: &ClaimSet) -> bool {
        Self::from_claims(claims).is_authenticated()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Normalized identity email; empty when unauthenticated.
    pub fn identity_email(&self) -> &str {
        &self.email
    }
}

/// The verified principal for one inbound request.
#[derive(Debug, Clone)]
pub struct RequestPrincipal {
    scheme: AuthScheme,
    claims: ClaimSet,
    context: UserContext,
}

impl RequestPrincipal {
    pub fn new(scheme: AuthScheme, claims: ClaimSet) -> Self {
        let context = UserContext::from_claims(&claims);
        Self {
            scheme,
            claims,
            context,
        }
    }

    /// The scheme whose verifier accepted this request.
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// The raw verified claim set, for finer-grained checks downstream.
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.is_authenticated()
    }

    pub fn email(&self) -> &str {
        self.context.identity_email()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_claim_authenticates() {
        let claims = ClaimSet::new().with(ClaimKind::UserEmail, "a@example.com");
        let context = UserContext::from_claims(&claims);

        assert!(context.is_authenticated());
        assert_eq!(context.identity_email(), "a@example.com");
    }

    #[test]
    fn missing_or_empty_email_does_not_authenticate() {
        let no_email = ClaimSet::new().with(ClaimKind::UserName, "Ghost");
        assert!(!UserContext::can_authenticate(&no_email));

        let empty_email = ClaimSet::new().with(ClaimKind::UserEmail, "");
        let context = UserContext::from_claims(&empty_email);
        assert!(!context.is_authenticated());
        assert_eq!(context.identity_email(), "");
    }

    #[test]
    fn repopulating_clears_previous_identity() {
        let mut context =
            UserContext::from_claims(&ClaimSet::new().with(ClaimKind::UserEmail, "a@example.com"));
        assert!(context.is_authenticated());

        context.populate(&ClaimSet::new());
        assert!(!context.is_authenticated());
        assert_eq!(context.identity_email(), "");
    }

    #[test]
    fn principal_snapshot() {
        let claims = ClaimSet::new()
            .with(ClaimKind::UserEmail, "a@example.com")
            .with(ClaimKind::Role, "Admin");
        let principal = RequestPrincipal::new(AuthScheme::Basic, claims.clone());

        assert_eq!(principal.scheme(), AuthScheme::Basic);
        assert!(principal.is_authenticated());
        assert_eq!(principal.email(), "a@example.com");
        assert_eq!(principal.claims(), &claims);
    }
}
