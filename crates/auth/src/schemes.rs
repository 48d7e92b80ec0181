//! Named authentication schemes.

/// The authentication schemes this deployment knows how to verify.
///
/// At the header level the two bearer schemes are indistinguishable; the
/// engine tries each configured bearer validator until one accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// `Authorization: Basic <base64(username:password)>`.
    Basic,
    /// `Authorization: Bearer <token>` signed with the local symmetric key.
    BearerSymmetric,
    /// `Authorization: Bearer <token>` signed by an external issuer.
    BearerAsymmetric,
}

impl AuthScheme {
    /// Every configured scheme, in the order the engine attempts them.
    pub const ALL: [AuthScheme; 3] = [
        AuthScheme::Basic,
        AuthScheme::BearerSymmetric,
        AuthScheme::BearerAsymmetric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::BearerSymmetric => "BearerSymmetric",
            AuthScheme::BearerAsymmetric => "BearerAsymmetric",
        }
    }
}

impl core::fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
