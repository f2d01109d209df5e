//! Application extension points
//!
//! The coordinator never interprets model bytes. Everything
//! model-specific comes from one `FederationApp` implementation injected
//! at construction.

use std::borrow::Borrow;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque worker identity: a hex public key, or a minted open-mode token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Error raised by application code. The message is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub message: String,
}

impl AppError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AppError {}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Callbacks the coordinator drives.
///
/// `on_worker_joined` / `on_worker_left` run after the registry lock is
/// released, so an implementation may observe registry state that has
/// already moved past the event it is handling.
#[async_trait]
pub trait FederationApp: Send + Sync + 'static {
    /// A worker became active
    async fn on_worker_joined(&self, worker: &WorkerId);

    /// A worker stopped being active
    async fn on_worker_left(&self, worker: &WorkerId);

    /// Serialized current global model
    async fn current_model(&self) -> Result<Bytes, AppError>;

    /// Human-readable global model status
    async fn model_status(&self) -> Result<String, AppError>;

    /// Take a decompressed update from an active worker. The returned text
    /// is passed back to the worker verbatim, including application-level
    /// rejections.
    async fn accept_update(&self, worker: &WorkerId, update: Bytes) -> Result<String, AppError>;
}
