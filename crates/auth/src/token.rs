//! Symmetric token issuance and validation.
//!
//! Tokens are compact HS256 JWTs carrying the canonical claim kinds plus any
//! custom claims. Validation is a pure function of the token, the shared
//! [`SigningConfig`], and the current time; there are no retries and no I/O.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::claims::{Claim, ClaimKind, ClaimSet};
use crate::error::{AuthError, AuthResult};

/// Issuer/audience/key/expiry configuration shared read-only by the token
/// issuer and the symmetric bearer verifier.
///
/// Loaded once at startup. Invalid values are a fatal startup error, never a
/// runtime one.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    issuer: String,
    audience: String,
    key: String,
    expiration_minutes: i64,
}

impl SigningConfig {
    pub const DEFAULT_ISSUER: &'static str = "clearbill-api";
    pub const DEFAULT_AUDIENCE: &'static str = "clearbill-api-clients";
    pub const DEFAULT_EXPIRATION_MINUTES: i64 = 60;

    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        key: impl Into<String>,
        expiration_minutes: i64,
    ) -> AuthResult<Self> {
        let issuer = issuer.into();
        let audience = audience.into();
        let key = key.into();

        if issuer.is_empty() || audience.is_empty() {
            return Err(AuthError::ConfigurationInvalid(
                "token issuer and audience must be non-empty".to_string(),
            ));
        }
        if key.is_empty() {
            return Err(AuthError::ConfigurationInvalid(
                "token signing key must be non-empty".to_string(),
            ));
        }
        if expiration_minutes < 1 {
            return Err(AuthError::ConfigurationInvalid(
                "token expiration must be at least one minute".to_string(),
            ));
        }

        Ok(Self {
            issuer,
            audience,
            key,
            expiration_minutes,
        })
    }

    /// Read the configuration from `CLEARBILL_JWT_*` environment variables.
    ///
    /// The signing key has no default: a missing `CLEARBILL_JWT_KEY` aborts
    /// startup rather than silently running with a guessable secret.
    pub fn from_env() -> AuthResult<Self> {
        let issuer = std::env::var("CLEARBILL_JWT_ISSUER")
            .unwrap_or_else(|_| Self::DEFAULT_ISSUER.to_string());
        let audience = std::env::var("CLEARBILL_JWT_AUDIENCE")
            .unwrap_or_else(|_| Self::DEFAULT_AUDIENCE.to_string());
        let key = std::env::var("CLEARBILL_JWT_KEY").map_err(|_| {
            AuthError::ConfigurationInvalid("CLEARBILL_JWT_KEY is not set".to_string())
        })?;
        let expiration_minutes = match std::env::var("CLEARBILL_JWT_EXPIRATION_MINUTES") {
            Ok(raw) => raw.parse::<i64>().map_err(|_| {
                AuthError::ConfigurationInvalid(format!(
                    "CLEARBILL_JWT_EXPIRATION_MINUTES is not a number: {raw}"
                ))
            })?,
            Err(_) => Self::DEFAULT_EXPIRATION_MINUTES,
        };

        Self::new(issuer, audience, key, expiration_minutes)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    pub fn expiration_minutes(&self) -> i64 {
        self.expiration_minutes
    }
}

/// Wire shape of an issued token's payload.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    iss: String,
    aud: String,
    exp: i64,
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

/// Issues and validates HS256 tokens under one [`SigningConfig`].
pub struct TokenIssuer {
    config: SigningConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: SigningConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.key_bytes());
        let decoding_key = DecodingKey::from_secret(config.key_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Encode a claim set into a signed token expiring after the configured
    /// duration.
    pub fn issue(&self, claims: &ClaimSet) -> AuthResult<String> {
        let expires_at = Utc::now() + Duration::minutes(self.config.expiration_minutes);

        let mut extra = BTreeMap::new();
        for claim in claims.iter() {
            if let ClaimKind::Custom(name) = &claim.kind {
                extra.insert(name.clone(), claim.value.clone());
            }
        }

        let payload = TokenClaims {
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expires_at.timestamp(),
            sub: claims.first(&ClaimKind::UserId).unwrap_or_default().to_string(),
            name: claims
                .first(&ClaimKind::UserName)
                .unwrap_or_default()
                .to_string(),
            email: claims.email().unwrap_or_default().to_string(),
            roles: claims.roles().map(str::to_string).collect(),
            permissions: claims.permissions().map(str::to_string).collect(),
            extra,
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|_| AuthError::TokenMalformed)
    }

    /// Verify signature, issuer, audience and expiry, then rebuild the claim
    /// set. Any mismatch yields a typed error.
    pub fn validate(&self, token: &str) -> AuthResult<ClaimSet> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry must be exact; the crate default allows 60s of clock drift.
        validation.leeway = 0;
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        Ok(claim_set_from_payload(data.claims))
    }
}

/// Rebuild canonical claims from a decoded payload.
///
/// Role entries land on [`ClaimKind::Role`] here regardless of how the token
/// spelled them, so downstream authorization never needs token-format
/// knowledge.
fn claim_set_from_payload(payload: TokenClaims) -> ClaimSet {
    let mut claims = ClaimSet::new();

    if !payload.sub.is_empty() {
        claims.push(Claim::new(ClaimKind::UserId, payload.sub));
    }
    if !payload.name.is_empty() {
        claims.push(Claim::new(ClaimKind::UserName, payload.name));
    }
    if !payload.email.is_empty() {
        claims.push(Claim::new(ClaimKind::UserEmail, payload.email));
    }
    for role in payload.roles {
        claims.push(Claim::new(ClaimKind::Role, role));
    }
    for permission in payload.permissions {
        claims.push(Claim::new(ClaimKind::Permission, permission));
    }
    for (name, value) in payload.extra {
        claims.push(Claim::new(ClaimKind::Custom(name), value));
    }

    claims
}

pub(crate) fn map_jwt_error(error: jsonwebtoken::errors::Error) -> AuthError {
    match error.kind() {
        ErrorKind::InvalidSignature => AuthError::TokenSignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
            AuthError::TokenIssuerOrAudienceMismatch
        }
        _ => AuthError::TokenMalformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CredentialStore;
    use proptest::prelude::*;

    fn test_config() -> SigningConfig {
        SigningConfig::new("test-issuer", "test-audience", "test-signing-key", 60).unwrap()
    }

    #[test]
    fn config_rejects_empty_key() {
        let err = SigningConfig::new("iss", "aud", "", 60).unwrap_err();
        assert!(matches!(err, AuthError::ConfigurationInvalid(_)));
    }

    #[test]
    fn config_rejects_zero_expiration() {
        let err = SigningConfig::new("iss", "aud", "key", 0).unwrap_err();
        assert!(matches!(err, AuthError::ConfigurationInvalid(_)));
    }

    #[test]
    fn issue_validate_round_trip() {
        let issuer = TokenIssuer::new(test_config());
        let store = CredentialStore::with_demo_identities();
        let claims = store.lookup("jdoe").unwrap().claims();

        let token = issuer.issue(&claims).unwrap();
        let validated = issuer.validate(&token).unwrap();

        assert_eq!(validated, claims);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let issuer = TokenIssuer::new(config.clone());

        // Hand-roll a token whose expiry is already in the past.
        let payload = TokenClaims {
            iss: config.issuer().to_string(),
            aud: config.audience().to_string(),
            exp: (Utc::now() - Duration::minutes(5)).timestamp(),
            sub: "jdoe".to_string(),
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            roles: vec!["Developer".to_string()],
            permissions: vec![],
            extra: BTreeMap::new(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(config.key_bytes()),
        )
        .unwrap();

        assert_eq!(issuer.validate(&token).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let issuing = TokenIssuer::new(
            SigningConfig::new("other-issuer", "test-audience", "test-signing-key", 60).unwrap(),
        );
        let validating = TokenIssuer::new(test_config());

        let claims = ClaimSet::new().with(ClaimKind::UserId, "jdoe");
        let token = issuing.issue(&claims).unwrap();

        assert_eq!(
            validating.validate(&token).unwrap_err(),
            AuthError::TokenIssuerOrAudienceMismatch
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let issuer = TokenIssuer::new(test_config());
        let other = TokenIssuer::new(
            SigningConfig::new("test-issuer", "test-audience", "different-key", 60).unwrap(),
        );

        let claims = ClaimSet::new().with(ClaimKind::UserId, "jdoe");
        let token = other.issue(&claims).unwrap();

        assert_eq!(
            issuer.validate(&token).unwrap_err(),
            AuthError::TokenSignatureInvalid
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        let issuer = TokenIssuer::new(test_config());
        assert_eq!(
            issuer.validate("not-a-token").unwrap_err(),
            AuthError::TokenMalformed
        );
    }

    proptest! {
        /// Any identity-shaped claim set survives an issue/validate cycle.
        #[test]
        fn round_trip_preserves_claims(
            user in "[a-z]{3,10}",
            name in "[A-Za-z ]{3,20}",
            roles in proptest::collection::vec("[A-Za-z]{2,12}", 0..4),
            permissions in proptest::collection::vec("[A-Za-z]{2,8}\\.[A-Za-z]{2,8}", 0..4),
            age in 1u32..120,
        ) {
            let issuer = TokenIssuer::new(test_config());

            let mut claims = ClaimSet::new()
                .with(ClaimKind::UserId, user.clone())
                .with(ClaimKind::UserName, name.clone())
                .with(ClaimKind::UserEmail, format!("{user}@example.com"))
                .with(ClaimKind::custom("age"), age.to_string());
            for role in &roles {
                claims.push(Claim::new(ClaimKind::Role, role.clone()));
            }
            for permission in &permissions {
                claims.push(Claim::new(ClaimKind::Permission, permission.clone()));
            }

            let token = issuer.issue(&claims).unwrap();
            prop_assert_eq!(issuer.validate(&token).unwrap(), claims);
        }
    }
}
