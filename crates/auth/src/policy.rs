//! Claims-based authorization: requirements, named policies, and the engine
//! that drives a request from raw headers to an allow/deny decision.
//!
//! Policies are registered once at startup in a [`PolicyRegistry`] (a plain
//! name → requirements table consulted by routing/middleware) and are
//! immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::basic::BasicVerifier;
use crate::bearer::{AsymmetricBearerVerifier, SymmetricBearerVerifier};
use crate::claims::{ClaimKind, ClaimSet, Permission, Role};
use crate::context::{RequestPrincipal, UserContext};
use crate::error::{AuthError, AuthResult};
use crate::schemes::AuthScheme;

/// A single predicate over a verified claim set.
///
/// A policy passes only when every one of its requirements is satisfied (AND
/// across requirements). Note the asymmetry: [`Requirement::PermissionAny`]
/// is satisfied by any one of its accepted values (OR within the requirement).
pub enum Requirement {
    /// At least one `Permission` claim whose value is in the accepted set.
    PermissionAny(Vec<Permission>),
    /// A `Role` claim with exactly this value.
    Role(Role),
    /// A claim of this kind present with a non-empty value.
    ClaimPresent(ClaimKind),
    /// A numeric claim that parses and is at least `minimum`. An absent or
    /// unparseable claim leaves the requirement unsatisfied; it never panics.
    MinimumValue { claim: ClaimKind, minimum: i64 },
    /// Caller-supplied predicate for anything the closed variants don't cover.
    Custom {
        description: String,
        predicate: Arc<dyn Fn(&ClaimSet) -> bool + Send + Sync>,
    },
}

impl Requirement {
    /// Minimum-age requirement over the `"age"` claim.
    pub fn minimum_age(years: i64) -> Self {
        Requirement::MinimumValue {
            claim: ClaimKind::custom("age"),
            minimum: years,
        }
    }

    pub fn is_satisfied(&self, claims: &ClaimSet) -> bool {
        match self {
            Requirement::PermissionAny(accepted) => accepted
                .iter()
                .any(|p| claims.contains(&ClaimKind::Permission, p.as_str())),
            Requirement::Role(role) => claims.contains(&ClaimKind::Role, role.as_str()),
            Requirement::ClaimPresent(kind) => {
                claims.first(kind).is_some_and(|value| !value.is_empty())
            }
            Requirement::MinimumValue { claim, minimum } => claims
                .first(claim)
                .and_then(|value| value.parse::<i64>().ok())
                .is_some_and(|value| value >= *minimum),
            Requirement::Custom { predicate, .. } => predicate(claims),
        }
    }

    /// Human-readable form used in deny reasons and logs.
    pub fn describe(&self) -> String {
        match self {
            Requirement::PermissionAny(accepted) => {
                let names: Vec<&str> = accepted.iter().map(Permission::as_str).collect();
                format!("any of permissions [{}]", names.join(", "))
            }
            Requirement::Role(role) => format!("role '{role}'"),
            Requirement::ClaimPresent(kind) => format!("claim '{kind}' present"),
            Requirement::MinimumValue { claim, minimum } => {
                format!("claim '{claim}' >= {minimum}")
            }
            Requirement::Custom { description, .. } => description.clone(),
        }
    }
}

impl core::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Requirement({})", self.describe())
    }
}

/// A named, immutable set of accepted schemes plus requirements.
#[derive(Debug)]
pub struct AuthorizationPolicy {
    name: String,
    schemes: Vec<AuthScheme>,
    requirements: Vec<Requirement>,
}

impl AuthorizationPolicy {
    /// New policy accepting every configured scheme until restricted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemes: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Restrict the policy to a scheme (may be called multiple times).
    pub fn accept_scheme(mut self, scheme: AuthScheme) -> Self {
        self.schemes.push(scheme);
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schemes this policy accepts; empty means "all configured schemes".
    pub fn schemes(&self) -> &[AuthScheme] {
        &self.schemes
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// All requirements must individually succeed; there are no partial
    /// grants.
    pub fn evaluate(&self, claims: &ClaimSet) -> AuthResult<()> {
        for requirement in &self.requirements {
            if !requirement.is_satisfied(claims) {
                tracing::warn!(
                    policy = %self.name,
                    requirement = %requirement.describe(),
                    "authorization requirement not satisfied"
                );
                return Err(AuthError::PolicyRequirementUnsatisfied(
                    requirement.describe(),
                ));
            }
        }
        Ok(())
    }
}

/// Startup-populated name → policy table.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, AuthorizationPolicy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, policy: AuthorizationPolicy) {
        self.policies.insert(policy.name().to_string(), policy);
    }

    pub fn get(&self, name: &str) -> Option<&AuthorizationPolicy> {
        self.policies.get(name)
    }
}

/// How an endpoint declares its authorization demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySelector {
    /// Endpoint declared nothing: any successful authentication suffices.
    Fallback,
    /// Endpoint declared the generic authenticated marker: authentication
    /// plus a usable identity (the email rule shared with [`UserContext`]).
    Authenticated,
    /// Endpoint named a registered policy.
    Named(String),
}

impl PolicySelector {
    pub fn named(name: impl Into<String>) -> Self {
        PolicySelector::Named(name.into())
    }
}

/// Outcome of a full authorize run.
#[derive(Debug)]
pub enum Decision {
    Allow(RequestPrincipal),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No accepted scheme produced a verified claim set. Carries the most
    /// specific verification failure observed.
    Unauthenticated(AuthError),
    /// Verification succeeded but a policy requirement did not hold.
    RequirementUnsatisfied { policy: String, requirement: String },
    /// The endpoint referenced a policy that was never registered.
    UnknownPolicy(String),
}

impl DenyReason {
    /// Distinguishes "who are you" denials (401) from "you may not" (403).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, DenyReason::Unauthenticated(_))
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenyReason::Unauthenticated(err) => write!(f, "{err}"),
            DenyReason::RequirementUnsatisfied { policy, requirement } => {
                write!(f, "policy '{policy}': requirement not satisfied: {requirement}")
            }
            DenyReason::UnknownPolicy(name) => write!(f, "unknown policy '{name}'"),
        }
    }
}

const DEFAULT_POLICY_NAME: &str = "default";

/// Drives one request through scheme selection, claims verification and
/// policy evaluation.
///
/// The per-request progression is strictly forward: unauthenticated → scheme
/// selected → claims verified → policy evaluated. Verifiers and the registry
/// are populated at startup and shared read-only across requests.
pub struct AuthorizationEngine {
    basic: BasicVerifier,
    bearer_symmetric: SymmetricBearerVerifier,
    bearer_asymmetric: Option<AsymmetricBearerVerifier>,
    policies: PolicyRegistry,
}

impl AuthorizationEngine {
    pub fn new(
        basic: BasicVerifier,
        bearer_symmetric: SymmetricBearerVerifier,
        policies: PolicyRegistry,
    ) -> Self {
        Self {
            basic,
            bearer_symmetric,
            bearer_asymmetric: None,
            policies,
        }
    }

    pub fn with_asymmetric(mut self, verifier: AsymmetricBearerVerifier) -> Self {
        self.bearer_asymmetric = Some(verifier);
        self
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Try each accepted scheme until one verifies the request's credentials.
    pub fn authenticate(
        &self,
        header_values: &[&str],
        accepted: &[AuthScheme],
    ) -> Result<(AuthScheme, ClaimSet), AuthError> {
        let mut last_error = AuthError::HeaderMissing;

        for scheme in accepted {
            match self.verify_scheme(*scheme, header_values) {
                Ok(claims) => return Ok((*scheme, claims)),
                Err(err) => {
                    tracing::debug!(scheme = %scheme, error = %err, "scheme verification failed");
                    // Scheme mismatches are expected while probing; keep the
                    // most specific failure for the final deny reason.
                    if !matches!(err, AuthError::SchemeMismatch)
                        || matches!(last_error, AuthError::HeaderMissing)
                    {
                        last_error = err;
                    }
                }
            }
        }

        Err(last_error)
    }

    fn verify_scheme(&self, scheme: AuthScheme, header_values: &[&str]) -> AuthResult<ClaimSet> {
        match scheme {
            AuthScheme::Basic => self.basic.verify(header_values),
            AuthScheme::BearerSymmetric => self.bearer_symmetric.verify(header_values),
            AuthScheme::BearerAsymmetric => match &self.bearer_asymmetric {
                Some(verifier) => verifier.verify(header_values),
                // Not configured in this deployment; treated like a scheme
                // this engine cannot accept.
                None => Err(AuthError::SchemeMismatch),
            },
        }
    }

    /// Full pipeline for one request.
    pub fn authorize(&self, header_values: &[&str], selector: &PolicySelector) -> Decision {
        let policy = match selector {
            PolicySelector::Named(name) => match self.policies.get(name) {
                Some(policy) => Some(policy),
                None => return Decision::Deny(DenyReason::UnknownPolicy(name.clone())),
            },
            _ => None,
        };

        let accepted: &[AuthScheme] = match policy {
            Some(p) if !p.schemes().is_empty() => p.schemes(),
            _ => &AuthScheme::ALL,
        };

        let (scheme, claims) = match self.authenticate(header_values, accepted) {
            Ok(verified) => verified,
            Err(err) => return Decision::Deny(DenyReason::Unauthenticated(err)),
        };

        // Default policy: the principal must also carry a usable identity.
        // Uses the same predicate as UserContext so the rules cannot diverge.
        if *selector == PolicySelector::Authenticated && !UserContext::can_authenticate(&claims) {
            return Decision::Deny(DenyReason::RequirementUnsatisfied {
                policy: DEFAULT_POLICY_NAME.to_string(),
                requirement: "identity email claim present".to_string(),
            });
        }

        // Named policy requirements; the fallback selector has none beyond
        // successful authentication.
        if let Some(policy) = policy
            && let Err(AuthError::PolicyRequirementUnsatisfied(requirement)) =
                policy.evaluate(&claims)
        {
            return Decision::Deny(DenyReason::RequirementUnsatisfied {
                policy: policy.name().to_string(),
                requirement,
            });
        }

        Decision::Allow(RequestPrincipal::new(scheme, claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CredentialStore;
    use crate::token::{SigningConfig, TokenIssuer};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;

    fn engine() -> (Arc<TokenIssuer>, AuthorizationEngine) {
        let store = Arc::new(CredentialStore::with_demo_identities());
        let issuer = Arc::new(TokenIssuer::new(
            SigningConfig::new("test-issuer", "test-audience", "test-signing-key", 60).unwrap(),
        ));

        let mut policies = PolicyRegistry::new();
        policies.register(
            AuthorizationPolicy::new("invoices.read").require(Requirement::PermissionAny(vec![
                Permission::new("Invoices.Read"),
            ])),
        );
        policies.register(
            AuthorizationPolicy::new("either.permission").require(Requirement::PermissionAny(
                vec![Permission::new("A"), Permission::new("B")],
            )),
        );
        policies.register(
            AuthorizationPolicy::new("a.and.admin")
                .require(Requirement::PermissionAny(vec![Permission::new("A")]))
                .require(Requirement::Role(Role::new("Admin"))),
        );
        policies.register(
            AuthorizationPolicy::new("adults.only").require(Requirement::minimum_age(18)),
        );
        policies.register(
            AuthorizationPolicy::new("basic.only")
                .accept_scheme(AuthScheme::Basic)
                .require(Requirement::ClaimPresent(ClaimKind::UserEmail)),
        );

        let engine = AuthorizationEngine::new(
            BasicVerifier::new(store),
            SymmetricBearerVerifier::new(issuer.clone()),
            policies,
        );
        (issuer, engine)
    }

    fn basic_header(username: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
    }

    fn bearer_header(issuer: &TokenIssuer, claims: &ClaimSet) -> String {
        format!("Bearer {}", issuer.issue(claims).unwrap())
    }

    #[test]
    fn permission_requirement_is_or_across_values() {
        let (issuer, engine) = engine();
        let claims = ClaimSet::new()
            .with(ClaimKind::UserEmail, "b@example.com")
            .with(ClaimKind::Permission, "B");

        let header = bearer_header(&issuer, &claims);
        let decision = engine.authorize(&[&header], &PolicySelector::named("either.permission"));

        assert!(decision.is_allowed(), "holding only B must satisfy [A, B]");
    }

    #[test]
    fn requirements_are_and_across_each_other() {
        let (issuer, engine) = engine();
        // Permission A but not role Admin.
        let claims = ClaimSet::new()
            .with(ClaimKind::UserEmail, "b@example.com")
            .with(ClaimKind::Permission, "A");

        let header = bearer_header(&issuer, &claims);
        let decision = engine.authorize(&[&header], &PolicySelector::named("a.and.admin"));

        match decision {
            Decision::Deny(DenyReason::RequirementUnsatisfied { policy, .. }) => {
                assert_eq!(policy, "a.and.admin");
            }
            other => panic!("expected requirement denial, got {other:?}"),
        }
    }

    #[test]
    fn default_policy_requires_identity_email() {
        let (issuer, engine) = engine();
        // Authenticates fine, but carries no email claim.
        let claims = ClaimSet::new()
            .with(ClaimKind::UserId, "service-7")
            .with(ClaimKind::Role, "Admin");
        let header = bearer_header(&issuer, &claims);

        let fallback = engine.authorize(&[&header], &PolicySelector::Fallback);
        assert!(fallback.is_allowed(), "fallback needs authentication only");

        let default = engine.authorize(&[&header], &PolicySelector::Authenticated);
        match default {
            Decision::Deny(DenyReason::RequirementUnsatisfied { policy, .. }) => {
                assert_eq!(policy, "default");
            }
            other => panic!("expected default-policy denial, got {other:?}"),
        }
    }

    #[test]
    fn all_schemes_failing_is_unauthenticated() {
        let (_issuer, engine) = engine();

        let decision = engine.authorize(&[], &PolicySelector::Fallback);
        match decision {
            Decision::Deny(reason) => assert!(reason.is_unauthenticated()),
            Decision::Allow(_) => panic!("no credentials must not authenticate"),
        }

        let header = basic_header("asmith", "wrong-password");
        let decision = engine.authorize(&[&header], &PolicySelector::Fallback);
        assert!(matches!(
            decision,
            Decision::Deny(DenyReason::Unauthenticated(AuthError::CredentialInvalid))
        ));
    }

    #[test]
    fn engine_tries_schemes_in_order() {
        let (issuer, engine) = engine();

        // Basic credentials verify via the Basic scheme.
        let header = basic_header("asmith", "as123");
        let decision = engine.authorize(&[&header], &PolicySelector::named("invoices.read"));
        match decision {
            Decision::Allow(principal) => {
                assert_eq!(principal.scheme(), AuthScheme::Basic);
                assert_eq!(principal.email(), "alice.smith@example.com");
            }
            other => panic!("expected allow, got {other:?}"),
        }

        // A minted token verifies via the symmetric bearer scheme.
        let claims = ClaimSet::new()
            .with(ClaimKind::UserEmail, "jdoe@example.com")
            .with(ClaimKind::Permission, "Invoices.Read");
        let header = bearer_header(&issuer, &claims);
        let decision = engine.authorize(&[&header], &PolicySelector::named("invoices.read"));
        match decision {
            Decision::Allow(principal) => {
                assert_eq!(principal.scheme(), AuthScheme::BearerSymmetric);
            }
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[test]
    fn policy_scheme_restriction_excludes_other_verifiers() {
        let (issuer, engine) = engine();
        let claims = ClaimSet::new().with(ClaimKind::UserEmail, "jdoe@example.com");
        let header = bearer_header(&issuer, &claims);

        // The token is valid, but "basic.only" never consults the bearer
        // verifier.
        let decision = engine.authorize(&[&header], &PolicySelector::named("basic.only"));
        assert!(matches!(
            decision,
            Decision::Deny(DenyReason::Unauthenticated(_))
        ));
    }

    #[test]
    fn minimum_age_requirement() {
        let (_issuer, engine) = engine();
        let selector = PolicySelector::named("adults.only");

        // Alice is 16.
        let alice = basic_header("asmith", "as123");
        assert!(!engine.authorize(&[&alice], &selector).is_allowed());

        // John is 61.
        let john = basic_header("jdoe", "jd123");
        assert!(engine.authorize(&[&john], &selector).is_allowed());
    }

    #[test]
    fn minimum_age_with_absent_or_garbled_claim_denies_without_panic() {
        let requirement = Requirement::minimum_age(18);

        let absent = ClaimSet::new().with(ClaimKind::UserEmail, "x@example.com");
        assert!(!requirement.is_satisfied(&absent));

        let garbled = ClaimSet::new().with(ClaimKind::custom("age"), "unknown");
        assert!(!requirement.is_satisfied(&garbled));
    }

    #[test]
    fn unknown_policy_is_denied_before_verification() {
        let (_issuer, engine) = engine();
        let header = basic_header("asmith", "as123");

        let decision = engine.authorize(&[&header], &PolicySelector::named("no.such.policy"));
        assert!(matches!(
            decision,
            Decision::Deny(DenyReason::UnknownPolicy(_))
        ));
    }

    #[test]
    fn custom_requirement_predicate() {
        let requirement = Requirement::Custom {
            description: "exactly one role".to_string(),
            predicate: Arc::new(|claims: &ClaimSet| claims.roles().count() == 1),
        };

        let one = ClaimSet::new().with(ClaimKind::Role, "Admin");
        let two = ClaimSet::new()
            .with(ClaimKind::Role, "Admin")
            .with(ClaimKind::Role, "User");

        assert!(requirement.is_satisfied(&one));
        assert!(!requirement.is_satisfied(&two));
    }

    /// Concurrent verification must be indistinguishable from sequential:
    /// the engine's shared state is read-only after startup.
    #[test]
    fn concurrent_requests_match_sequential_results() {
        let (issuer, engine) = engine();
        let engine = Arc::new(engine);

        let mut requests: Vec<(String, PolicySelector)> = Vec::new();
        for i in 0..100 {
            let request = match i % 4 {
                0 => (basic_header("asmith", "as123"), PolicySelector::named("invoices.read")),
                1 => (basic_header("jdoe", "jd123"), PolicySelector::named("adults.only")),
                2 => (
                    bearer_header(
                        &issuer,
                        &ClaimSet::new()
                            .with(ClaimKind::UserId, format!("user-{i}"))
                            .with(ClaimKind::UserEmail, format!("user-{i}@example.com"))
                            .with(ClaimKind::Permission, "Invoices.Read"),
                    ),
                    PolicySelector::named("invoices.read"),
                ),
                _ => (basic_header("asmith", "wrong"), PolicySelector::Fallback),
            };
            requests.push(request);
        }

        let summarize = |decision: Decision| -> String {
            match decision {
                Decision::Allow(p) => format!("allow:{}", p.email()),
                Decision::Deny(reason) => format!("deny:{reason}"),
            }
        };

        let sequential: Vec<String> = requests
            .iter()
            .map(|(header, selector)| summarize(engine.authorize(&[header], selector)))
            .collect();

        let handles: Vec<_> = requests
            .iter()
            .cloned()
            .map(|(header, selector)| {
                let engine = engine.clone();
                std::thread::spawn(move || summarize(engine.authorize(&[&header], &selector)))
            })
            .collect();
        let concurrent: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(sequential, concurrent);
    }
}
