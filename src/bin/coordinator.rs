//! Coordinator service binary
//!
//! Runs the HTTP coordinator with a small federated-averaging
//! application: updates are little-endian `f32` vectors, and every
//! `UPDATE_LIMIT` updates from distinct workers are averaged into a new
//! global model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fedlink_core::coordinator::AppError;
use fedlink_core::{server, Coordinator, CoordinatorConfig, FederationApp, WorkerId};

/// Global model plus the updates collected for the next round
struct FedAvgModel {
    update_limit: usize,
    state: Mutex<FedAvgState>,
}

struct FedAvgState {
    model: Vec<f32>,
    version: u64,
    pending: HashMap<WorkerId, Vec<f32>>,
    participants: usize,
}

impl FedAvgModel {
    fn new(initial: Vec<f32>, update_limit: usize) -> Self {
        Self {
            update_limit: update_limit.max(1),
            state: Mutex::new(FedAvgState {
                model: initial,
                version: 0,
                pending: HashMap::new(),
                participants: 0,
            }),
        }
    }
}

fn decode_f32s(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

fn encode_f32s(values: &[f32]) -> Bytes {
    Bytes::from(values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>())
}

#[async_trait]
impl FederationApp for FedAvgModel {
    async fn on_worker_joined(&self, worker: &WorkerId) {
        self.state.lock().participants += 1;
        info!("Worker {} joined the federation", worker);
    }

    async fn on_worker_left(&self, worker: &WorkerId) {
        let mut state = self.state.lock();
        state.participants = state.participants.saturating_sub(1);
        state.pending.remove(worker);
        info!("Worker {} left the federation", worker);
    }

    async fn current_model(&self) -> Result<Bytes, AppError> {
        Ok(encode_f32s(&self.state.lock().model))
    }

    async fn model_status(&self) -> Result<String, AppError> {
        let state = self.state.lock();
        Ok(format!(
            "version={} pending={}/{} participants={}",
            state.version,
            state.pending.len(),
            self.update_limit,
            state.participants
        ))
    }

    async fn accept_update(&self, worker: &WorkerId, update: Bytes) -> Result<String, AppError> {
        let values = decode_f32s(&update)
            .ok_or_else(|| AppError::new("update is not a sequence of f32 values"))?;

        let mut state = self.state.lock();
        if !state.model.is_empty() && values.len() != state.model.len() {
            return Ok(format!(
                "Update rejected: expected {} parameters, got {}",
                state.model.len(),
                values.len()
            ));
        }

        state.pending.insert(worker.clone(), values);
        if state.pending.len() >= self.update_limit {
            let count = state.pending.len() as f32;
            let width = state.pending.values().map(Vec::len).max().unwrap_or(0);
            let mut averaged = vec![0.0f32; width];
            for update in state.pending.values() {
                for (acc, v) in averaged.iter_mut().zip(update) {
                    *acc += v / count;
                }
            }
            state.model = averaged;
            state.version += 1;
            state.pending.clear();
            info!("Global model advanced to version {}", state.version);
        }

        Ok("Worker update received".into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Fedlink Coordinator");

    let config = CoordinatorConfig::from_env()?;

    let update_limit = std::env::var("UPDATE_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    let initial_model = match std::env::var("MODEL_FILE") {
        Ok(path) => {
            let bytes = std::fs::read(&path)?;
            decode_f32s(&bytes).ok_or("MODEL_FILE is not a sequence of f32 values")?
        }
        Err(_) => Vec::new(),
    };

    let app = Arc::new(FedAvgModel::new(initial_model, update_limit));
    let coordinator = match Coordinator::new(&config, app) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to start coordinator: {}", e);
            return Err(e.into());
        }
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    server::serve(listener, coordinator, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await?;

    Ok(())
}
