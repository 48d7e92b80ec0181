//! Registered identities and credential verification.
//!
//! This is a demo credential store: identities are seeded at startup from a
//! static list and are immutable afterwards, which makes the store safe for
//! unsynchronized concurrent reads. Production systems should delegate to a
//! dedicated identity provider instead of rolling their own store.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::claims::{Claim, ClaimKind, ClaimSet, Permission, Role};
use crate::error::{AuthError, AuthResult};

/// A registered identity. Owned exclusively by [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct Identity {
    username: String,
    display_name: String,
    email: String,
    salt: String,
    password_hash: [u8; 32],
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    age: u32,
}

impl Identity {
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        permissions: Vec<Permission>,
        roles: Vec<Role>,
        age: u32,
    ) -> Self {
        let username = username.into();
        // Salt derived per identity; recorded alongside the hash so the
        // comparison stays deterministic.
        let salt = format!("{username}.v1");
        let password_hash = hash_password(&salt, password);

        Self {
            username,
            display_name: display_name.into(),
            email: email.into(),
            salt,
            password_hash,
            permissions,
            roles,
            age,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Rebuild the identity's claim set. Derived fresh on every verification;
    /// the set is never mutated in place.
    pub fn claims(&self) -> ClaimSet {
        let mut claims = ClaimSet::new()
            .with(ClaimKind::UserId, &self.username)
            .with(ClaimKind::UserName, &self.display_name)
            .with(ClaimKind::UserEmail, &self.email)
            .with(ClaimKind::custom("age"), self.age.to_string());

        for permission in &self.permissions {
            claims.push(Claim::new(ClaimKind::Permission, permission.as_str()));
        }
        for role in &self.roles {
            claims.push(Claim::new(ClaimKind::Role, role.as_str()));
        }

        claims
    }

    /// Deterministic one-way comparison against the stored hash.
    pub fn verify_password(&self, plaintext: &str) -> bool {
        hash_password(&self.salt, plaintext) == self.password_hash
    }
}

fn hash_password(salt: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Read-only store of registered identities, keyed by username.
#[derive(Debug)]
pub struct CredentialStore {
    users: HashMap<String, Identity>,
}

impl CredentialStore {
    /// Build a store from an explicit identity list.
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        let users = identities
            .into_iter()
            .map(|identity| (identity.username.clone(), identity))
            .collect();
        Self { users }
    }

    /// The demo seed list.
    pub fn with_demo_identities() -> Self {
        Self::new([
            Identity::new(
                "asmith",
                "Alice Smith",
                "alice.smith@example.com",
                "as123",
                vec![
                    Permission::new("Invoices.Read"),
                    Permission::new("Invoices.Modify"),
                ],
                vec![Role::new("Admin")],
                16,
            ),
            Identity::new(
                "jdoe",
                "John Doe",
                "john.doe@example.com",
                "jd123",
                vec![
                    Permission::new("Invoices.Read"),
                    Permission::new("Access.Invoice.Dev.Resources"),
                ],
                vec![Role::new("Basic"), Role::new("Developer")],
                61,
            ),
        ])
    }

    pub fn lookup(&self, username: &str) -> Option<&Identity> {
        self.users.get(username)
    }

    /// Verify a username/password pair and derive the identity's claims.
    ///
    /// Unknown username and wrong password produce the same
    /// [`AuthError::CredentialInvalid`] so callers cannot enumerate usernames.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<ClaimSet> {
        match self.lookup(username) {
            Some(identity) if identity.verify_password(password) => Ok(identity.claims()),
            _ => Err(AuthError::CredentialInvalid),
        }
    }
}
