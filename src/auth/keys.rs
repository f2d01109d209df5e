//! Worker-side key material
//!
//! Generation, hex import/export and phrase signing for the Ed25519
//! key pair a worker registers with.

use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;

use crate::error::{FedlinkError, Result};

/// An Ed25519 key pair held by a worker
#[derive(Clone)]
pub struct WorkerKeyPair {
    signing_key: SigningKey,
}

impl WorkerKeyPair {
    /// Generate a fresh key pair from the OS RNG
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restore from a hex-encoded 32-byte seed
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self> {
        let bytes = hex::decode(seed_hex.trim()).map_err(|e| FedlinkError::Config {
            reason: format!("private key is not hex: {}", e),
        })?;
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes.as_slice().try_into().map_err(|_| FedlinkError::Config {
                reason: format!(
                    "private key must be {} bytes, found {}",
                    SECRET_KEY_LENGTH,
                    bytes.len()
                ),
            })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Hex-encoded seed, for the private key file
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Hex-encoded public key. This is the worker's identity in key-restricted mode.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Detached signature over the phrase, hex-encoded
    pub fn sign_phrase(&self, phrase: &str) -> String {
        hex::encode(self.signing_key.sign(phrase.as_bytes()).to_bytes())
    }

    /// Signature followed by the phrase itself, hex-encoded
    pub fn sign_phrase_attached(&self, phrase: &str) -> String {
        let mut out = self.signing_key.sign(phrase.as_bytes()).to_bytes().to_vec();
        out.extend_from_slice(phrase.as_bytes());
        hex::encode(out)
    }
}

impl std::fmt::Debug for WorkerKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerKeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}
