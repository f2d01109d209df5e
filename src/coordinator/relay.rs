//! Update relay
//!
//! Moves opaque payloads between active workers and the application.
//! Each operation checks registry membership first and invokes exactly
//! one application callback on success. Codec and callback failures come
//! back as error values, never as panics, so one worker's bad payload
//! cannot affect other requests.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::app::{FederationApp, WorkerId};
use super::registry::WorkerRegistry;
use crate::compression::{self, CompressionConfig};
use crate::error::{FedlinkError, Result};
use crate::metrics::standard;

/// Relays updates, status queries and model fetches
pub struct UpdateRelay {
    registry: Arc<WorkerRegistry>,
    app: Arc<dyn FederationApp>,
    compression: CompressionConfig,
}

impl UpdateRelay {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        app: Arc<dyn FederationApp>,
        compression: CompressionConfig,
    ) -> Self {
        Self {
            registry,
            app,
            compression,
        }
    }

    /// Decompress a worker update and hand it to the application
    pub async fn submit_update(&self, worker_id: &str, payload: Bytes) -> Result<String> {
        let _timer = standard::RELAY_DURATION.start_timer();
        let worker = self.admit(worker_id, "send an update")?;

        let compressed_len = payload.len();
        let config = self.compression.clone();
        let update = run_codec(move || compression::decompress(&payload, &config))
            .await
            .inspect_err(|e| relay_failed(&worker, e))?;

        debug!(
            "Update from {} decompressed to {} bytes (ratio {:.2})",
            worker,
            update.len(),
            compression::compression_ratio(update.len(), compressed_len)
        );

        let reply = self
            .app
            .accept_update(&worker, update)
            .await
            .map_err(|e| FedlinkError::Callback { message: e.message })
            .inspect_err(|e| relay_failed(&worker, e))?;

        standard::UPDATES_RECEIVED.inc();
        Ok(reply)
    }

    /// Global model status, not specific to the asking worker
    pub async fn query_status(&self, worker_id: &str) -> Result<String> {
        let _timer = standard::RELAY_DURATION.start_timer();
        let worker = self.admit(worker_id, "query model status")?;

        self.app
            .model_status()
            .await
            .map_err(|e| FedlinkError::Callback { message: e.message })
            .inspect_err(|e| relay_failed(&worker, e))
    }

    /// Current global model, compressed for the wire
    pub async fn fetch_model(&self, worker_id: &str) -> Result<Bytes> {
        let _timer = standard::RELAY_DURATION.start_timer();
        let worker = self.admit(worker_id, "fetch the global model")?;

        let model = self
            .app
            .current_model()
            .await
            .map_err(|e| FedlinkError::Callback { message: e.message })
            .inspect_err(|e| relay_failed(&worker, e))?;

        let config = self.compression.clone();
        let compressed = run_codec(move || compression::compress(&model, &config))
            .await
            .inspect_err(|e| relay_failed(&worker, e))?;

        standard::MODEL_FETCHES.inc();
        Ok(compressed)
    }

    fn admit(&self, worker_id: &str, action: &str) -> Result<WorkerId> {
        match self.registry.check_participant(worker_id) {
            Ok(()) => Ok(WorkerId::from(worker_id)),
            Err(e) => {
                warn!("Worker {} tried to {}: {}", worker_id, action, e);
                standard::UNREGISTERED_REQUESTS.inc();
                Err(e)
            }
        }
    }
}

/// Run a compression step off the async workers
async fn run_codec<F>(f: F) -> Result<Bytes>
where
    F: FnOnce() -> Result<Bytes> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FedlinkError::Internal {
            message: format!("codec task failed: {}", e),
        })?
}

fn relay_failed(worker: &WorkerId, err: &FedlinkError) {
    warn!("Relay for {} failed: {}", worker, err);
    standard::RELAY_ERRORS.inc();
}
