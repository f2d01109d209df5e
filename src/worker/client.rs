//! Coordinator client for workers
//!
//! HTTP client wrapper for worker-coordinator communication.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::{WorkerKeyPair, DEFAULT_AUTH_PHRASE};
use crate::compression::{self, CompressionConfig};
use crate::coordinator::WorkerId;
use crate::error::{FedlinkError, Result, UnregisteredReason};
use crate::server::{
    INVALID_WORKER, QUERY_GLOBAL_MODEL_STATUS_ROUTE, RECEIVE_WORKER_UPDATE_ROUTE,
    REGISTER_WORKER_ROUTE, RETURN_GLOBAL_MODEL_ROUTE, UNREGISTERED_WORKER,
};

/// Configuration for coordinator client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Coordinator base URL
    pub coordinator_addr: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Phrase signed at registration
    pub auth_phrase: String,
    /// Payload compression
    pub compression: CompressionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: "http://localhost:8080".into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            auth_phrase: DEFAULT_AUTH_PHRASE.into(),
            compression: CompressionConfig::default(),
        }
    }
}

/// Coordinator client for workers
pub struct WorkerClient {
    config: ClientConfig,
    client: Client,
    key: Option<WorkerKeyPair>,
    worker_id: RwLock<Option<WorkerId>>,
}

impl WorkerClient {
    /// Create a client. Without a key pair the worker can only join an open-mode coordinator.
    pub fn new(config: ClientConfig, key: Option<WorkerKeyPair>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| FedlinkError::ConnectionFailed {
                endpoint: config.coordinator_addr.clone(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            key,
            worker_id: RwLock::new(None),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.coordinator_addr.trim_end_matches('/'), route)
    }

    fn connection_failed(&self, e: reqwest::Error) -> FedlinkError {
        FedlinkError::ConnectionFailed {
            endpoint: self.config.coordinator_addr.clone(),
            reason: e.to_string(),
        }
    }

    async fn read_text(&self, resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.connection_failed(e))?;
        if !status.is_success() {
            return Err(server_error(status, &body));
        }
        String::from_utf8(body.to_vec()).map_err(|e| FedlinkError::MalformedRequest {
            reason: format!("response is not UTF-8: {}", e),
        })
    }

    /// Identity assigned at registration, if any
    pub async fn worker_id(&self) -> Option<WorkerId> {
        self.worker_id.read().await.clone()
    }

    async fn require_id(&self) -> Result<WorkerId> {
        self.worker_id().await.ok_or_else(|| FedlinkError::Config {
            reason: "not registered yet; call register() first".into(),
        })
    }

    /// Register with the coordinator
    pub async fn register(&self) -> Result<WorkerId> {
        let (public_key, signed_phrase) = match &self.key {
            Some(key) => (key.public_key_hex(), key.sign_phrase(&self.config.auth_phrase)),
            None => (String::new(), String::new()),
        };

        let resp = self
            .client
            .post(self.url(REGISTER_WORKER_ROUTE))
            .json(&json!({
                "public_key_str": public_key,
                "signed_phrase": signed_phrase,
            }))
            .send()
            .await
            .map_err(|e| self.connection_failed(e))?;

        let body = self.read_text(resp).await?;
        if body == INVALID_WORKER {
            warn!("Coordinator rejected registration for {}", public_key);
            return Err(FedlinkError::AuthenticationFailed { identity: public_key });
        }

        let id = WorkerId::new(body);
        info!("Registered with coordinator as {}", id);
        *self.worker_id.write().await = Some(id.clone());
        Ok(id)
    }

    /// Compress and send a model update
    pub async fn send_update(&self, update: &[u8]) -> Result<String> {
        let id = self.require_id().await?;
        let payload = compression::compress(update, &self.config.compression)?;
        debug!("Sending {} byte update ({} compressed)", update.len(), payload.len());

        let resp = self
            .client
            .post(self.url(&format!("{}/{}", RECEIVE_WORKER_UPDATE_ROUTE, id)))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.connection_failed(e))?;

        let body = self.read_text(resp).await?;
        check_sentinel(&id, body)
    }

    /// Ask for the global model status
    pub async fn query_status(&self) -> Result<String> {
        let id = self.require_id().await?;
        let resp = self
            .client
            .post(self.url(QUERY_GLOBAL_MODEL_STATUS_ROUTE))
            .json(&json!({ "worker_id": id }))
            .send()
            .await
            .map_err(|e| self.connection_failed(e))?;

        let body = self.read_text(resp).await?;
        check_sentinel(&id, body)
    }

    /// Download and decompress the global model
    pub async fn fetch_model(&self) -> Result<Bytes> {
        let id = self.require_id().await?;
        let resp = self
            .client
            .post(self.url(RETURN_GLOBAL_MODEL_ROUTE))
            .json(&json!({ "worker_id": id }))
            .send()
            .await
            .map_err(|e| self.connection_failed(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.connection_failed(e))?;
        if !status.is_success() {
            return Err(server_error(status, &body));
        }
        if body.as_ref() == UNREGISTERED_WORKER.as_bytes() {
            return Err(unregistered(&id));
        }

        compression::decompress(&body, &self.config.compression)
    }
}

fn check_sentinel(id: &WorkerId, body: String) -> Result<String> {
    if body == UNREGISTERED_WORKER {
        Err(unregistered(id))
    } else {
        Ok(body)
    }
}

/// The sentinel does not say whether the id is unknown or inactive
fn unregistered(id: &WorkerId) -> FedlinkError {
    warn!("Coordinator no longer recognises worker {}", id);
    FedlinkError::UnregisteredWorker {
        identity: id.to_string(),
        reason: UnregisteredReason::Unreported,
    }
}

fn server_error(status: StatusCode, body: &[u8]) -> FedlinkError {
    let text = String::from_utf8_lossy(body);
    match status {
        StatusCode::BAD_REQUEST => FedlinkError::MalformedRequest {
            reason: text.into_owned(),
        },
        _ => FedlinkError::Internal {
            message: format!("coordinator returned {}: {}", status, text),
        },
    }
}
