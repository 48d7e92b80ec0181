//! Claim model shared by every verifier and the policy engine.
//!
//! Authentication handlers map whatever their wire format carries into the
//! canonical [`ClaimKind`] set, so the authorization layer never needs
//! scheme-specific knowledge.

use std::borrow::Cow;

/// Closed enumeration of claim kinds the authorization layer relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimKind {
    UserId,
    UserName,
    UserEmail,
    Role,
    Permission,
    /// Escape hatch for claims outside the canonical set (e.g. `"age"`).
    Custom(String),
}

impl ClaimKind {
    /// Wire name used in issued tokens and error messages.
    pub fn as_str(&self) -> &str {
        match self {
            ClaimKind::UserId => "id",
            ClaimKind::UserName => "name",
            ClaimKind::UserEmail => "email",
            ClaimKind::Role => "role",
            ClaimKind::Permission => "permission",
            ClaimKind::Custom(name) => name,
        }
    }

    /// Map a wire name back onto the canonical set (case-insensitive).
    ///
    /// Unknown names become [`ClaimKind::Custom`] rather than being dropped.
    pub fn from_wire(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "id" => ClaimKind::UserId,
            "name" => ClaimKind::UserName,
            "email" => ClaimKind::UserEmail,
            "role" => ClaimKind::Role,
            "permission" => ClaimKind::Permission,
            _ => ClaimKind::Custom(name.to_string()),
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        ClaimKind::Custom(name.into())
    }
}

impl core::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (kind, value) fact about a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Claim {
    pub kind: ClaimKind,
    pub value: String,
}

impl Claim {
    pub fn new(kind: ClaimKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// An order-irrelevant collection of claims.
///
/// Built once per request by the active verifier and never mutated afterwards;
/// equality ignores insertion order.
#[derive(Debug, Clone, Default, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    pub fn with(mut self, kind: ClaimKind, value: impl Into<String>) -> Self {
        self.push(Claim::new(kind, value));
        self
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    /// First value of the given kind, if any.
    pub fn first(&self, kind: &ClaimKind) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| &c.kind == kind)
            .map(|c| c.value.as_str())
    }

    /// All values of the given kind.
    pub fn values_of(&self, kind: ClaimKind) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    /// Whether a claim with this exact kind and value exists.
    pub fn contains(&self, kind: &ClaimKind, value: &str) -> bool {
        self.claims
            .iter()
            .any(|c| &c.kind == kind && c.value == value)
    }

    pub fn email(&self) -> Option<&str> {
        self.first(&ClaimKind::UserEmail)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.values_of(ClaimKind::Role)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.values_of(ClaimKind::Permission)
    }

    fn sorted(&self) -> Vec<&Claim> {
        let mut v: Vec<&Claim> = self.claims.iter().collect();
        v.sort();
        v
    }
}

impl PartialEq for ClaimSet {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<T: IntoIterator<Item = Claim>>(iter: T) -> Self {
        Self {
            claims: iter.into_iter().collect(),
        }
    }
}

/// Role identifier used by role-based requirements.
///
/// Roles are opaque strings at this layer; policies decide what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission identifier (e.g. `"Invoices.Read"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_order() {
        let a = ClaimSet::new()
            .with(ClaimKind::Role, "Admin")
            .with(ClaimKind::UserEmail, "a@example.com");
        let b = ClaimSet::new()
            .with(ClaimKind::UserEmail, "a@example.com")
            .with(ClaimKind::Role, "Admin");

        assert_eq!(a, b);
    }

    #[test]
    fn first_and_values_of() {
        let claims = ClaimSet::new()
            .with(ClaimKind::Permission, "Invoices.Read")
            .with(ClaimKind::Permission, "Invoices.Modify")
            .with(ClaimKind::UserEmail, "a@example.com");

        assert_eq!(claims.email(), Some("a@example.com"));
        let perms: Vec<_> = claims.permissions().collect();
        assert_eq!(perms, vec!["Invoices.Read", "Invoices.Modify"]);
        assert!(claims.contains(&ClaimKind::Permission, "Invoices.Read"));
        assert!(!claims.contains(&ClaimKind::Permission, "Invoices.Delete"));
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            ClaimKind::UserId,
            ClaimKind::UserName,
            ClaimKind::UserEmail,
            ClaimKind::Role,
            ClaimKind::Permission,
        ] {
            assert_eq!(ClaimKind::from_wire(kind.as_str()), kind);
        }

        assert_eq!(
            ClaimKind::from_wire("age"),
            ClaimKind::Custom("age".to_string())
        );
        // Canonical names are matched case-insensitively.
        assert_eq!(ClaimKind::from_wire("Email"), ClaimKind::UserEmail);
    }
}
