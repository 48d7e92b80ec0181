//! `Authorization: Basic` credential verification.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::claims::ClaimSet;
use crate::error::{AuthError, AuthResult};
use crate::store::CredentialStore;

/// Decodes an inbound Basic credential header and checks it against the
/// credential store.
#[derive(Clone)]
pub struct BasicVerifier {
    store: Arc<CredentialStore>,
}

impl BasicVerifier {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// Verify the `Authorization` header values for this request.
    ///
    /// The rejection ladder runs strictly in order; in particular a decode
    /// failure returns before the store is ever consulted.
    pub fn verify(&self, header_values: &[&str]) -> AuthResult<ClaimSet> {
        let header = match header_values {
            [] => return Err(AuthError::HeaderMissing),
            [single] if !single.is_empty() => *single,
            _ => return Err(AuthError::HeaderMalformed),
        };

        let (scheme, parameter) = header.split_once(' ').ok_or(AuthError::HeaderMalformed)?;
        if !scheme.eq_ignore_ascii_case("Basic") {
            return Err(AuthError::SchemeMismatch);
        }

        let decoded = BASE64
            .decode(parameter.trim())
            .map_err(|_| AuthError::DecodeError)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::DecodeError)?;

        // Split on the first ':' only; passwords may themselves contain one.
        let (username, password) = decoded.split_once(':').ok_or(AuthError::HeaderMalformed)?;

        self.store.authenticate(username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimKind;

    fn verifier() -> BasicVerifier {
        BasicVerifier::new(Arc::new(CredentialStore::with_demo_identities()))
    }

    fn basic_header(username: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
    }

    #[test]
    fn valid_credentials_verify() {
        let header = basic_header("asmith", "as123");
        let claims = verifier().verify(&[&header]).unwrap();

        assert_eq!(claims.email(), Some("alice.smith@example.com"));
        assert!(claims.contains(&ClaimKind::Permission, "Invoices.Modify"));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert_eq!(verifier().verify(&[]).unwrap_err(), AuthError::HeaderMissing);
    }

    #[test]
    fn multiple_header_values_are_rejected() {
        let header = basic_header("asmith", "as123");
        assert_eq!(
            verifier().verify(&[&header, &header]).unwrap_err(),
            AuthError::HeaderMalformed
        );
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        assert_eq!(
            verifier().verify(&["Bearer abc.def.ghi"]).unwrap_err(),
            AuthError::SchemeMismatch
        );
    }

    #[test]
    fn bad_base64_is_a_decode_error_not_a_lookup() {
        // `CredentialInvalid` would mean the store was consulted; a decode
        // failure must short-circuit before that.
        assert_eq!(
            verifier().verify(&["Basic not-base64!!!"]).unwrap_err(),
            AuthError::DecodeError
        );
    }

    #[test]
    fn missing_colon_is_rejected() {
        let header = format!("Basic {}", BASE64.encode("asmith-no-colon"));
        assert_eq!(
            verifier().verify(&[&header]).unwrap_err(),
            AuthError::HeaderMalformed
        );
    }

    #[test]
    fn password_containing_colon_splits_on_first() {
        let header = basic_header("asmith", "as:123");
        // Wrong password (the real one has no colon), but it must reach the
        // store as "as:123" and fail as a credential error, not a parse error.
        assert_eq!(
            verifier().verify(&[&header]).unwrap_err(),
            AuthError::CredentialInvalid
        );
    }

    #[test]
    fn wrong_password_is_a_credential_error() {
        let header = basic_header("asmith", "wrong");
        assert_eq!(
            verifier().verify(&[&header]).unwrap_err(),
            AuthError::CredentialInvalid
        );
    }
}
