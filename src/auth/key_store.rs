//! Authorized worker keys
//!
//! Loaded once at startup from a line-oriented file of hex-encoded
//! Ed25519 public keys. Immutable after load.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use tracing::info;

use crate::error::{FedlinkError, Result};

/// Fixed set of authorized public keys, keyed by their hex text
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: HashMap<String, VerifyingKey>,
    /// File order, for seeding the registry deterministically
    order: Vec<String>,
}

impl KeyStore {
    /// Load a key list file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| FedlinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_reader(file)?;
        info!("Loaded {} worker keys from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parse one hex key per line. Blank lines are skipped, duplicates collapse.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut store = Self::default();

        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| FedlinkError::KeyStore {
                line: line_no,
                reason: e.to_string(),
            })?;
            let key_hex = line.trim();
            if key_hex.is_empty() {
                continue;
            }

            let key = parse_public_key(key_hex).map_err(|reason| FedlinkError::KeyStore {
                line: line_no,
                reason,
            })?;
            store.insert(key_hex.to_string(), key);
        }

        Ok(store)
    }

    /// Build from already-encoded keys
    pub fn from_hex_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::default();
        for (idx, key_hex) in keys.into_iter().enumerate() {
            let key_hex = key_hex.as_ref().trim();
            let key = parse_public_key(key_hex).map_err(|reason| FedlinkError::KeyStore {
                line: idx + 1,
                reason,
            })?;
            store.insert(key_hex.to_string(), key);
        }
        Ok(store)
    }

    fn insert(&mut self, key_hex: String, key: VerifyingKey) {
        if self.keys.insert(key_hex.clone(), key).is_none() {
            self.order.push(key_hex);
        }
    }

    /// Is this key authorized?
    pub fn contains(&self, key_hex: &str) -> bool {
        self.keys.contains_key(key_hex)
    }

    /// Look up the verifying key for an identity
    pub fn get(&self, key_hex: &str) -> Option<&VerifyingKey> {
        self.keys.get(key_hex)
    }

    /// Keys in file order
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn parse_public_key(key_hex: &str) -> std::result::Result<VerifyingKey, String> {
    let bytes = hex::decode(key_hex).map_err(|e| format!("not hex: {}", e))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        format!(
            "expected {} bytes, found {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        )
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| format!("not an Ed25519 point: {}", e))
}
