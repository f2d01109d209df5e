//! Administrator gate
//!
//! All-or-nothing check of a username/password pair against the
//! credentials supplied at construction. No configured credentials
//! means every request is denied.

use sha2::{Digest, Sha256};

/// Administrator username and password
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Gate in front of every registry mutation and the worker listing
#[derive(Debug, Clone, Default)]
pub struct AdminGuard {
    credentials: Option<AdminCredentials>,
}

impl AdminGuard {
    pub fn new(credentials: Option<AdminCredentials>) -> Self {
        Self { credentials }
    }

    /// A guard that refuses everyone
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// True only if both username and password match exactly
    pub fn authorize(&self, username: &str, password: &str) -> bool {
        let Some(expected) = &self.credentials else {
            return false;
        };
        // Both comparisons always run
        let user_ok = digest_eq(&expected.username, username);
        let pass_ok = digest_eq(&expected.password, password);
        user_ok & pass_ok
    }
}

/// Compare fixed-size digests so the comparison time does not depend on
/// where the inputs first differ
fn digest_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
