//! Worker authentication
//!
//! A worker proves possession of the private key for its claimed
//! identity by signing the agreed phrase. Without a key list every
//! worker is accepted and the outcome is tagged `Open`.
//!
//! The unknown-key and bad-signature paths both return a rejection,
//! but they are not constant-time equivalent: an unknown key returns
//! before any curve arithmetic runs.

use ed25519_dalek::{Signature, SIGNATURE_LENGTH};
use tracing::{debug, info, warn};

use super::key_store::KeyStore;

/// Phrase workers sign when no other value is configured
pub const DEFAULT_AUTH_PHRASE: &str = "fedlink-worker-registration:v1";

/// Process-wide authentication mode, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMode {
    /// No key list: every worker is accepted, identity is minted
    Open,
    /// Identity must be a listed key and the signature must verify
    KeyRestricted,
}

impl std::fmt::Display for AuthenticationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthenticationMode::Open => write!(f, "open"),
            AuthenticationMode::KeyRestricted => write!(f, "key-restricted"),
        }
    }
}

/// Result of one authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOutcome {
    pub accepted: bool,
    pub mode: AuthenticationMode,
}

/// Verifies worker proofs against the key store
#[derive(Debug, Clone)]
pub struct Authenticator {
    keys: Option<KeyStore>,
    phrase: String,
}

impl Authenticator {
    /// Accept every worker. Development and testing only.
    pub fn open() -> Self {
        warn!("No key list provided - worker authentication is DISABLED");
        Self {
            keys: None,
            phrase: DEFAULT_AUTH_PHRASE.into(),
        }
    }

    /// Only accept workers holding a listed key
    pub fn key_restricted(keys: KeyStore, phrase: impl Into<String>) -> Self {
        Self {
            keys: Some(keys),
            phrase: phrase.into(),
        }
    }

    /// Pick the mode from whether a key list was supplied
    pub fn from_key_store(keys: Option<KeyStore>, phrase: impl Into<String>) -> Self {
        match keys {
            Some(keys) => Self::key_restricted(keys, phrase),
            None => Self {
                phrase: phrase.into(),
                ..Self::open()
            },
        }
    }

    pub fn mode(&self) -> AuthenticationMode {
        match self.keys {
            Some(_) => AuthenticationMode::KeyRestricted,
            None => AuthenticationMode::Open,
        }
    }

    pub fn key_store(&self) -> Option<&KeyStore> {
        self.keys.as_ref()
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Check a worker's proof of possession.
    ///
    /// `signed_proof` is either a detached signature over the phrase or the
    /// signature immediately followed by the phrase bytes.
    pub fn authenticate(&self, claimed_identity: &str, signed_proof: &[u8]) -> AuthOutcome {
        let Some(keys) = &self.keys else {
            warn!("Accepting worker without authentication (open mode)");
            return AuthOutcome {
                accepted: true,
                mode: AuthenticationMode::Open,
            };
        };

        let rejected = AuthOutcome {
            accepted: false,
            mode: AuthenticationMode::KeyRestricted,
        };

        let Some(verifying_key) = keys.get(claimed_identity) else {
            warn!("Rejected worker with unlisted public key: {}", claimed_identity);
            return rejected;
        };

        let Some(signature) = self.extract_signature(signed_proof) else {
            warn!("Rejected worker {}: malformed signed phrase", claimed_identity);
            return rejected;
        };

        match verifying_key.verify_strict(self.phrase.as_bytes(), &signature) {
            Ok(()) => {
                info!("Authenticated worker with public key: {}", claimed_identity);
                AuthOutcome {
                    accepted: true,
                    mode: AuthenticationMode::KeyRestricted,
                }
            }
            Err(e) => {
                warn!("Failed to authenticate worker {}: {}", claimed_identity, e);
                rejected
            }
        }
    }

    fn extract_signature(&self, proof: &[u8]) -> Option<Signature> {
        if proof.len() < SIGNATURE_LENGTH {
            return None;
        }
        let (sig, message) = proof.split_at(SIGNATURE_LENGTH);
        if !message.is_empty() && message != self.phrase.as_bytes() {
            debug!("Attached message does not match the agreed phrase");
            return None;
        }
        let sig: [u8; SIGNATURE_LENGTH] = sig.try_into().ok()?;
        Some(Signature::from_bytes(&sig))
    }
}
