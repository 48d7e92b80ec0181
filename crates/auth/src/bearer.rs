//! `Authorization: Bearer` token verification.
//!
//! Two configured variants share the header handling: the symmetric verifier
//! checks tokens this process issued, the asymmetric verifier checks tokens
//! signed by an external issuer whose public keys come from a pluggable
//! provider. Both end in the same canonical claim shape so the policy engine
//! never sees scheme-specific claims.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::claims::{Claim, ClaimKind, ClaimSet};
use crate::error::{AuthError, AuthResult};
use crate::token::{TokenIssuer, map_jwt_error};

/// Pull the token out of the `Authorization` header values.
fn extract_bearer_token<'a>(header_values: &[&'a str]) -> AuthResult<&'a str> {
    let header = match header_values {
        [] => return Err(AuthError::HeaderMissing),
        [single] if !single.is_empty() => *single,
        _ => return Err(AuthError::HeaderMalformed),
    };

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::HeaderMalformed)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::SchemeMismatch);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::HeaderMalformed);
    }

    Ok(token)
}

/// Verifier for tokens signed with the local symmetric key.
#[derive(Clone)]
pub struct SymmetricBearerVerifier {
    issuer: Arc<TokenIssuer>,
}

impl SymmetricBearerVerifier {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Delegates signature/issuer/audience/expiry checks to the token issuer;
    /// the issuer's decode step already lands role-bearing claims on
    /// [`ClaimKind::Role`].
    pub fn verify(&self, header_values: &[&str]) -> AuthResult<ClaimSet> {
        let token = extract_bearer_token(header_values)?;
        self.issuer.validate(token)
    }
}

/// Source of an external issuer's published verification keys.
///
/// Real deployments back this with a JWKS endpoint; the provider owns
/// fetching and refresh, the verifier only consumes keys. A provider may be
/// slow, which is why [`CachedKeyProvider`] sits in front of it.
pub trait IssuerKeyProvider: Send + Sync {
    fn load_key(&self, kid: &str) -> AuthResult<DecodingKey>;
}

impl<P> IssuerKeyProvider for Arc<P>
where
    P: IssuerKeyProvider + ?Sized,
{
    fn load_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        (**self).load_key(kid)
    }
}

/// First-write-wins per-kid cache over a key provider.
///
/// Lookup protocol: check under the read lock; on a miss take the write lock
/// and re-check before loading, so concurrent requests for the same kid load
/// the key exactly once.
pub struct CachedKeyProvider<P> {
    inner: P,
    cache: RwLock<HashMap<String, DecodingKey>>,
}

impl<P: IssuerKeyProvider> CachedKeyProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, kid: &str) -> AuthResult<DecodingKey> {
        if let Ok(cache) = self.cache.read()
            && let Some(key) = cache.get(kid)
        {
            return Ok(key.clone());
        }

        let mut cache = match self.cache.write() {
            Ok(cache) => cache,
            // Poisoned lock: skip the cache rather than fail the request.
            Err(_) => return self.inner.load_key(kid),
        };

        // Another request may have loaded the key while we waited for the
        // write lock.
        if let Some(key) = cache.get(kid) {
            return Ok(key.clone());
        }

        let key = self.inner.load_key(kid)?;
        cache.insert(kid.to_string(), key.clone());
        Ok(key)
    }
}

impl<P: IssuerKeyProvider> IssuerKeyProvider for CachedKeyProvider<P> {
    fn load_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        self.resolve(kid)
    }
}

/// Static kid → PEM map, enough for tests and single-issuer deployments.
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    pems: HashMap<String, String>,
}

impl StaticKeyProvider {
    pub fn new(pems: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            pems: pems.into_iter().collect(),
        }
    }
}

impl IssuerKeyProvider for StaticKeyProvider {
    fn load_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        let pem = self
            .pems
            .get(kid)
            .ok_or(AuthError::TokenSignatureInvalid)?;
        DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|_| {
            AuthError::ConfigurationInvalid(format!("unusable PEM for key id '{kid}'"))
        })
    }
}

/// Claim names external issuers commonly use.
#[derive(Debug, Default, Deserialize)]
struct ExternalClaims {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: serde_json::Value,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
}

/// Verifier for tokens signed by an external issuer (RS256).
pub struct AsymmetricBearerVerifier {
    issuer: String,
    audience: String,
    keys: CachedKeyProvider<Arc<dyn IssuerKeyProvider>>,
}

impl AsymmetricBearerVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        provider: Arc<dyn IssuerKeyProvider>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys: CachedKeyProvider::new(provider),
        }
    }

    /// Optional external-issuer configuration from `CLEARBILL_EXTERNAL_JWT_*`.
    ///
    /// Returns `Ok(None)` when no external issuer is configured. A partially
    /// configured issuer is a startup error.
    pub fn from_env() -> AuthResult<Option<Self>> {
        let issuer = match std::env::var("CLEARBILL_EXTERNAL_JWT_ISSUER") {
            Ok(value) if !value.is_empty() => value,
            _ => return Ok(None),
        };

        let audience = std::env::var("CLEARBILL_EXTERNAL_JWT_AUDIENCE").map_err(|_| {
            AuthError::ConfigurationInvalid("CLEARBILL_EXTERNAL_JWT_AUDIENCE is not set".to_string())
        })?;
        let pem = std::env::var("CLEARBILL_EXTERNAL_JWT_KEY_PEM").map_err(|_| {
            AuthError::ConfigurationInvalid("CLEARBILL_EXTERNAL_JWT_KEY_PEM is not set".to_string())
        })?;
        let kid =
            std::env::var("CLEARBILL_EXTERNAL_JWT_KID").unwrap_or_else(|_| "default".to_string());

        let provider: Arc<dyn IssuerKeyProvider> = Arc::new(StaticKeyProvider::new([(kid, pem)]));
        Ok(Some(Self::new(issuer, audience, provider)))
    }

    pub fn verify(&self, header_values: &[&str]) -> AuthResult<ClaimSet> {
        let token = extract_bearer_token(header_values)?;

        let header = decode_header(token).map_err(|_| AuthError::TokenMalformed)?;
        let kid = header.kid.ok_or(AuthError::TokenMalformed)?;
        let key = self.keys.resolve(&kid)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<ExternalClaims>(token, &key, &validation).map_err(map_jwt_error)?;

        Ok(normalize_external_claims(data.claims))
    }
}

/// Map an external issuer's claim names onto the canonical kinds.
///
/// Role claims arrive either as a single `role` value, a `role` array, or a
/// `roles` array depending on the issuer; all three land on
/// [`ClaimKind::Role`].
fn normalize_external_claims(external: ExternalClaims) -> ClaimSet {
    let mut claims = ClaimSet::new();

    if !external.sub.is_empty() {
        claims.push(Claim::new(ClaimKind::UserId, external.sub));
    }
    if !external.name.is_empty() {
        claims.push(Claim::new(ClaimKind::UserName, external.name));
    }
    if !external.email.is_empty() {
        claims.push(Claim::new(ClaimKind::UserEmail, external.email));
    }

    match external.role {
        serde_json::Value::String(role) => {
            claims.push(Claim::new(ClaimKind::Role, role));
        }
        serde_json::Value::Array(roles) => {
            for role in roles.into_iter().filter_map(|r| match r {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            }) {
                claims.push(Claim::new(ClaimKind::Role, role));
            }
        }
        _ => {}
    }
    for role in external.roles {
        claims.push(Claim::new(ClaimKind::Role, role));
    }
    for permission in external.permissions {
        claims.push(Claim::new(ClaimKind::Permission, permission));
    }

    claims
}
