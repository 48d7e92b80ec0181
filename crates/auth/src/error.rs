//! Authentication/authorization failure taxonomy.

use thiserror::Error;

/// Result type used across the auth boundary.
pub type AuthResult<T> = Result<T, AuthError>;

/// Why a verification or authorization step rejected a request.
///
/// Every per-request failure is recovered into one of these variants and
/// surfaced to the caller as an authentication/authorization rejection;
/// nothing here escapes into business logic. `ConfigurationInvalid` is the
/// one exception: it is produced at startup only and aborts the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header was presented.
    #[error("missing authorization header")]
    HeaderMissing,

    /// The authorization header was present but unusable (multiple values,
    /// empty value, or missing parts).
    #[error("invalid authorization header")]
    HeaderMalformed,

    /// The header named a scheme this verifier does not handle.
    #[error("invalid authorization scheme")]
    SchemeMismatch,

    /// The credential parameter could not be decoded (bad base64 / not UTF-8).
    #[error("invalid authorization header format")]
    DecodeError,

    /// Unknown username or wrong password. Deliberately indistinguishable to
    /// resist username enumeration.
    #[error("invalid username or password")]
    CredentialInvalid,

    #[error("token signature is invalid")]
    TokenSignatureInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token issuer or audience mismatch")]
    TokenIssuerOrAudienceMismatch,

    /// The token could not be parsed at all (structure, base64, JSON, alg).
    #[error("malformed token")]
    TokenMalformed,

    /// A policy requirement was evaluated and not satisfied.
    #[error("authorization requirement not satisfied: {0}")]
    PolicyRequirementUnsatisfied(String),

    /// Startup-fatal: the security configuration is unusable.
    #[error("invalid security configuration: {0}")]
    ConfigurationInvalid(String),
}
