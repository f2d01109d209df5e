//! Worker service binary
//!
//! Registers with the coordinator, then loops: check the model status,
//! pull the global model, nudge it and send it back as an update.

use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fedlink_core::auth::{WorkerKeyPair, DEFAULT_AUTH_PHRASE};
use fedlink_core::worker::{ClientConfig, WorkerClient};
use fedlink_core::FedlinkError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Fedlink Worker");

    let coordinator_addr =
        std::env::var("COORDINATOR_ADDR").unwrap_or_else(|_| "http://localhost:8080".into());
    let auth_phrase = std::env::var("AUTH_PHRASE").unwrap_or_else(|_| DEFAULT_AUTH_PHRASE.into());
    let interval_secs: u64 = std::env::var("UPDATE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let key = match std::env::var("WORKER_KEY_FILE") {
        Ok(path) => {
            let seed = std::fs::read_to_string(&path)?;
            let key = WorkerKeyPair::from_seed_hex(seed.trim())?;
            info!("Loaded worker key {} from {}", key.public_key_hex(), path);
            Some(key)
        }
        Err(_) => {
            warn!("WORKER_KEY_FILE not set; registering without a key");
            None
        }
    };

    info!("Connecting to coordinator at {}", coordinator_addr);
    let client = WorkerClient::new(
        ClientConfig {
            coordinator_addr,
            auth_phrase,
            ..Default::default()
        },
        key,
    )?;

    let mut backoff = Duration::from_secs(1);
    loop {
        match client.register().await {
            Ok(_) => break,
            Err(e) if e.is_retryable() => {
                warn!("Coordinator unreachable ({}), retrying in {:?}", e, backoff);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(30));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        if let Err(e) = round(&client).await {
            if e.is_unregistered() {
                warn!("Dropped by coordinator, registering again");
                if let Err(e) = client.register().await {
                    error!("Re-registration failed: {}", e);
                }
            } else {
                error!("Round failed: {}", e);
            }
        }
    }
}

async fn round(client: &WorkerClient) -> Result<(), FedlinkError> {
    let status = client.query_status().await?;
    info!("Global model status: {}", status);

    let model = client.fetch_model().await?;
    let mut params: Vec<f32> = model
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if params.is_empty() {
        params = vec![0.0; 16];
    }
    // Stand-in for local training
    for p in params.iter_mut() {
        *p += 0.01;
    }

    let update: Vec<u8> = params.iter().flat_map(|p| p.to_le_bytes()).collect();
    let reply = client.send_update(&update).await?;
    info!("Coordinator replied: {}", reply);
    Ok(())
}
