//! Coordinator
//!
//! Composes authentication, the worker registry and the update relay:
//! a worker proves its identity, the registry admits it, and relay
//! operations re-check membership on every call. Admin operations
//! bypass the authenticator; the transport applies the admin guard.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use super::app::{FederationApp, WorkerId};
use super::registry::{Admission, WorkerEntry, WorkerRegistry};
use super::relay::UpdateRelay;
use crate::auth::{AdminGuard, AuthenticationMode, Authenticator, KeyStore};
use crate::compression::CompressionConfig;
use crate::config::CoordinatorConfig;
use crate::error::{FedlinkError, Result};
use crate::metrics::standard;

/// Main coordinator
pub struct Coordinator {
    authenticator: Authenticator,
    registry: Arc<WorkerRegistry>,
    relay: UpdateRelay,
    admin: AdminGuard,
}

impl Coordinator {
    /// Create a coordinator from configuration, loading the key list if one is set
    pub fn new(config: &CoordinatorConfig, app: Arc<dyn FederationApp>) -> Result<Self> {
        let keys = config
            .key_list_file
            .as_ref()
            .map(KeyStore::load)
            .transpose()?;
        let authenticator = Authenticator::from_key_store(keys, config.auth_phrase.clone());
        let admin = AdminGuard::new(config.admin.clone());

        Ok(Self::with_parts(
            authenticator,
            admin,
            config.compression.clone(),
            app,
        ))
    }

    /// Assemble from prepared components.
    ///
    /// In key-restricted mode every listed key is seeded into the registry as
    /// known-but-inactive so that it can register without an admin add.
    pub fn with_parts(
        authenticator: Authenticator,
        admin: AdminGuard,
        compression: CompressionConfig,
        app: Arc<dyn FederationApp>,
    ) -> Self {
        let registry = Arc::new(WorkerRegistry::new(app.clone()));

        if let Some(keys) = authenticator.key_store() {
            let seeded = registry.seed_known(keys.identities().map(WorkerId::from));
            info!("Seeded registry with {} listed worker keys", seeded);
        }

        if !admin.is_configured() {
            warn!("No admin credentials configured - admin API will deny every request");
        }

        info!("Coordinator ready in {} mode", authenticator.mode());

        let relay = UpdateRelay::new(registry.clone(), app, compression);
        Self {
            authenticator,
            registry,
            relay,
            admin,
        }
    }

    pub fn mode(&self) -> AuthenticationMode {
        self.authenticator.mode()
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn admin_guard(&self) -> &AdminGuard {
        &self.admin
    }

    /// Authenticate a worker and admit it.
    ///
    /// `signed_phrase` is the hex encoding of the worker's proof. Returns the
    /// identity the worker must use for every later request.
    pub async fn register_worker(&self, public_key: &str, signed_phrase: &str) -> Result<WorkerId> {
        let proof = hex::decode(signed_phrase.trim()).unwrap_or_default();
        let outcome = self.authenticator.authenticate(public_key, &proof);

        if !outcome.accepted {
            standard::AUTH_FAILURES.inc();
            info!("Failed to register worker with public key: {}", public_key);
            return Err(FedlinkError::AuthenticationFailed {
                identity: public_key.to_string(),
            });
        }

        let admission = match outcome.mode {
            AuthenticationMode::Open => Admission::Open,
            AuthenticationMode::KeyRestricted => Admission::Verified(WorkerId::from(public_key)),
        };

        match self.registry.register(admission).await {
            Ok(id) => {
                match outcome.mode {
                    AuthenticationMode::Open => {
                        warn!("Worker {} admitted UNAUTHENTICATED (open mode)", id);
                        standard::UNAUTHENTICATED_REGISTRATIONS.inc();
                    }
                    AuthenticationMode::KeyRestricted => standard::REGISTRATIONS.inc(),
                }
                Ok(id)
            }
            Err(e) => {
                standard::AUTH_FAILURES.inc();
                Err(e)
            }
        }
    }

    /// Relay a compressed update from a worker
    pub async fn submit_update(&self, worker_id: &str, payload: Bytes) -> Result<String> {
        self.relay.submit_update(worker_id, payload).await
    }

    /// Global model status for an active worker
    pub async fn query_status(&self, worker_id: &str) -> Result<String> {
        self.relay.query_status(worker_id).await
    }

    /// Compressed global model for an active worker
    pub async fn fetch_model(&self, worker_id: &str) -> Result<Bytes> {
        self.relay.fetch_model(worker_id).await
    }

    pub fn admin_list(&self) -> Vec<WorkerEntry> {
        self.registry.list()
    }

    pub async fn admin_add(&self, worker_id: WorkerId, active: bool) -> Result<WorkerEntry> {
        info!("Admin is adding worker {}", worker_id);
        self.registry.admin_add(worker_id, active).await
    }

    pub async fn admin_remove(&self, worker_id: &str) -> bool {
        info!("Admin is removing worker {}", worker_id);
        self.registry.admin_remove(worker_id).await
    }

    pub async fn admin_set_active(&self, worker_id: &str, active: bool) -> Result<WorkerEntry> {
        info!("Admin is setting worker {} active={}", worker_id, active);
        self.registry.admin_set_active(worker_id, active).await?;
        Ok(WorkerEntry {
            worker_id: WorkerId::from(worker_id),
            active,
        })
    }
}
