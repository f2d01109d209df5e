//! Coordinator configuration
//!
//! Assembled from environment variables at startup; every field has a
//! default except the key list and admin credentials.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

use crate::auth::{AdminCredentials, DEFAULT_AUTH_PHRASE};
use crate::compression::{CompressionConfig, CompressionLevel};
use crate::error::{FedlinkError, Result};

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Configuration for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Key list; `Some` selects key-restricted authentication
    pub key_list_file: Option<PathBuf>,
    /// Admin credentials; `None` denies every admin request
    pub admin: Option<AdminCredentials>,
    /// Phrase workers sign to register
    pub auth_phrase: String,
    /// Payload compression
    pub compression: CompressionConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            key_list_file: None,
            admin: None,
            auth_phrase: DEFAULT_AUTH_PHRASE.into(),
            compression: CompressionConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.trim().parse().map_err(|e| FedlinkError::Config {
                reason: format!("BIND_ADDR {:?}: {}", addr, e),
            })?;
        }

        config.key_list_file = get("KEY_LIST_FILE").map(PathBuf::from);

        config.admin = match (get("ADMIN_USERNAME"), get("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials::new(username, password)),
            (None, None) => None,
            _ => {
                warn!("Only one of ADMIN_USERNAME / ADMIN_PASSWORD is set; admin API disabled");
                None
            }
        };

        if let Some(phrase) = get("AUTH_PHRASE") {
            config.auth_phrase = phrase;
        }

        if let Some(level) = get("COMPRESSION_LEVEL") {
            let level: u32 = level.trim().parse().map_err(|e| FedlinkError::Config {
                reason: format!("COMPRESSION_LEVEL {:?}: {}", level, e),
            })?;
            config.compression.level = CompressionLevel::new(level)?;
        }

        if let Some(max) = get("MAX_UPDATE_BYTES") {
            config.compression.max_decompressed_bytes =
                max.trim().parse().map_err(|e| FedlinkError::Config {
                    reason: format!("MAX_UPDATE_BYTES {:?}: {}", max, e),
                })?;
        }

        Ok(config)
    }
}
