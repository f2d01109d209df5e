//! Error types for Fedlink
//!
//! Error taxonomy covering authentication, registry membership,
//! payload relay, and startup/configuration failures.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a worker failed the membership precondition of a relay operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisteredReason {
    /// Identity is not in the known set
    Unknown,
    /// Identity is known but not active
    Inactive,
    /// Coordinator answered with the sentinel, which does not say which of the above
    Unreported,
}

impl fmt::Display for UnregisteredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnregisteredReason::Unknown => write!(f, "unknown"),
            UnregisteredReason::Inactive => write!(f, "inactive"),
            UnregisteredReason::Unreported => write!(f, "refused by coordinator"),
        }
    }
}

/// Primary error type for all Fedlink operations
#[derive(Debug, Error)]
pub enum FedlinkError {
    // ========== Authentication Errors ==========

    /// Unknown key or bad signature
    #[error("Authentication failed for {identity}")]
    AuthenticationFailed { identity: String },

    /// Key-restricted registration for an identity the registry does not know
    #[error("Worker {identity} is not provisioned")]
    NotProvisioned { identity: String },

    // ========== Registry Errors ==========

    /// Relay precondition failed
    #[error("Worker {identity} is not registered ({reason})")]
    UnregisteredWorker {
        identity: String,
        reason: UnregisteredReason,
    },

    /// Admin tried to add an identity that is already known
    #[error("Worker {identity} already exists")]
    AlreadyExists { identity: String },

    /// Identity rejected before touching the registry
    #[error("Invalid worker identity: {reason}")]
    InvalidIdentity { reason: String },

    /// Admin targeted an identity the registry does not know
    #[error("Unknown worker: {identity}")]
    UnknownWorker { identity: String },

    // ========== Request Errors ==========

    /// Missing field, wrong type, undecodable body
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    // ========== Relay Errors ==========

    /// Inbound payload could not be decompressed
    #[error("Decompression failed: {message}")]
    Decompression { message: String },

    /// Outbound payload could not be compressed
    #[error("Compression failed: {message}")]
    Compression { message: String },

    /// The application callback reported an error
    #[error("Application error: {message}")]
    Callback { message: String },

    // ========== Startup Errors ==========

    /// A line in the key list could not be parsed
    #[error("Invalid key on line {line}: {reason}")]
    KeyStore { line: usize, reason: String },

    /// File access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration value rejected
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // ========== Client Errors ==========

    /// Connection to the coordinator failed
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FedlinkError {
    /// Returns true for the relay sentinel kind
    pub fn is_unregistered(&self) -> bool {
        matches!(self, FedlinkError::UnregisteredWorker { .. })
    }

    /// Returns true if the caller sent something the coordinator cannot act on
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FedlinkError::AuthenticationFailed { .. }
                | FedlinkError::NotProvisioned { .. }
                | FedlinkError::UnregisteredWorker { .. }
                | FedlinkError::AlreadyExists { .. }
                | FedlinkError::InvalidIdentity { .. }
                | FedlinkError::UnknownWorker { .. }
                | FedlinkError::MalformedRequest { .. }
                | FedlinkError::Decompression { .. }
        )
    }

    /// Returns true if retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, FedlinkError::ConnectionFailed { .. })
    }
}

/// Result type alias for Fedlink operations
pub type Result<T> = std::result::Result<T, FedlinkError>;
