//! Worker registry
//!
//! Tracks the identities the coordinator knows about and the subset
//! currently allowed to exchange updates. `active ⊆ known` holds after
//! every operation.
//!
//! All reads and writes of the two sets go through one mutex, and every
//! check-then-insert sequence runs under a single guard. Join/leave
//! callbacks fire after the guard is dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use tracing::{debug, info, warn};

use super::app::{FederationApp, WorkerId};
use crate::error::{FedlinkError, Result, UnregisteredReason};
use crate::metrics::standard;

/// Suffix marking identities minted without key verification
pub const UNAUTHENTICATED_SUFFIX: &str = "_unauthenticated";

/// How a registering worker is admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Open mode: the registry mints the identity
    Open,
    /// Key-restricted mode: the verified public key is the identity
    Verified(WorkerId),
}

/// One row of the worker listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub worker_id: WorkerId,
    pub active: bool,
}

/// Effect of an admin status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
    Unchanged,
}

#[derive(Default)]
struct RegistryState {
    /// Known identities in insertion order
    order: Vec<WorkerId>,
    known: HashSet<WorkerId>,
    active: HashSet<WorkerId>,
}

impl RegistryState {
    fn insert_known(&mut self, id: &WorkerId) -> bool {
        if self.known.insert(id.clone()) {
            self.order.push(id.clone());
            true
        } else {
            false
        }
    }

    fn remove_known(&mut self, id: &str) -> bool {
        if self.known.remove(id) {
            self.order.retain(|known| known.as_str() != id);
            true
        } else {
            false
        }
    }

    fn membership(&self, id: &str) -> std::result::Result<(), UnregisteredReason> {
        if !self.known.contains(id) {
            return Err(UnregisteredReason::Unknown);
        }
        if !self.active.contains(id) {
            return Err(UnregisteredReason::Inactive);
        }
        Ok(())
    }

    fn publish_gauges(&self) {
        standard::KNOWN_WORKERS.set(self.known.len() as i64);
        standard::ACTIVE_WORKERS.set(self.active.len() as i64);
    }
}

/// Known/active worker sets plus the join/leave callbacks they drive
pub struct WorkerRegistry {
    state: Mutex<RegistryState>,
    app: Arc<dyn FederationApp>,
    mint_seq: AtomicU64,
}

impl WorkerRegistry {
    /// Create an empty registry
    pub fn new(app: Arc<dyn FederationApp>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            app,
            mint_seq: AtomicU64::new(0),
        }
    }

    /// Add identities to `known` without activating them. No callbacks fire.
    pub fn seed_known<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = WorkerId>,
    {
        let mut state = self.state.lock();
        let added = ids
            .into_iter()
            .filter(|id| state.insert_known(id))
            .count();
        state.publish_gauges();
        added
    }

    /// Admit a worker and activate it.
    ///
    /// Fires `on_worker_joined` once per successful call, even when the
    /// identity was already active.
    pub async fn register(&self, admission: Admission) -> Result<WorkerId> {
        let id = {
            let mut state = self.state.lock();
            let id = match admission {
                Admission::Open => {
                    let mut id = self.mint_identity();
                    while state.known.contains(&id) {
                        id = self.mint_identity();
                    }
                    state.insert_known(&id);
                    id
                }
                Admission::Verified(id) => {
                    if !state.known.contains(&id) {
                        warn!("Unprovisioned worker {} tried to register", id);
                        return Err(FedlinkError::NotProvisioned {
                            identity: id.into_string(),
                        });
                    }
                    id
                }
            };
            state.active.insert(id.clone());
            state.publish_gauges();
            id
        };

        info!("Registered worker: {}", id);
        self.app.on_worker_joined(&id).await;
        Ok(id)
    }

    /// Admin: add an identity, optionally activating it
    pub async fn admin_add(&self, id: WorkerId, activate: bool) -> Result<WorkerEntry> {
        if id.as_str().is_empty() {
            return Err(FedlinkError::InvalidIdentity {
                reason: "identity must be a non-empty string".into(),
            });
        }

        {
            let mut state = self.state.lock();
            if !state.insert_known(&id) {
                warn!("Worker {} already exists", id);
                return Err(FedlinkError::AlreadyExists {
                    identity: id.into_string(),
                });
            }
            if activate {
                state.active.insert(id.clone());
            }
            state.publish_gauges();
        }

        info!("Worker {} was added (active={})", id, activate);
        if activate {
            self.app.on_worker_joined(&id).await;
        }

        Ok(WorkerEntry {
            worker_id: id,
            active: activate,
        })
    }

    /// Admin: forget an identity. Absent identities are not an error.
    ///
    /// Returns whether the identity was known.
    pub async fn admin_remove(&self, id: &str) -> bool {
        let (was_known, was_active) = {
            let mut state = self.state.lock();
            let was_active = state.active.remove(id);
            let was_known = state.remove_known(id);
            state.publish_gauges();
            (was_known, was_active)
        };

        if was_known {
            info!("Worker {} was removed", id);
        } else {
            debug!("Remove requested for unknown worker {}", id);
        }

        if was_active {
            info!("Worker {} was deactivated by removal", id);
            self.app.on_worker_left(&WorkerId::from(id)).await;
        }

        was_known
    }

    /// Admin: move an identity between active and inactive
    pub async fn admin_set_active(&self, id: &str, active: bool) -> Result<Transition> {
        let transition = {
            let mut state = self.state.lock();
            if !state.known.contains(id) {
                warn!("Status change for unknown worker {}", id);
                return Err(FedlinkError::UnknownWorker {
                    identity: id.to_string(),
                });
            }

            let was_active = state.active.contains(id);
            let transition = match (was_active, active) {
                (false, true) => {
                    state.active.insert(WorkerId::from(id));
                    Transition::Activated
                }
                (true, false) => {
                    state.active.remove(id);
                    Transition::Deactivated
                }
                _ => Transition::Unchanged,
            };
            state.publish_gauges();
            transition
        };

        let worker = WorkerId::from(id);
        match transition {
            Transition::Activated => {
                info!("Worker {} was activated", worker);
                self.app.on_worker_joined(&worker).await;
            }
            Transition::Deactivated => {
                info!("Worker {} was deactivated", worker);
                self.app.on_worker_left(&worker).await;
            }
            Transition::Unchanged => {
                debug!("Nothing to change for {}", worker);
            }
        }

        Ok(transition)
    }

    /// Snapshot in insertion order
    pub fn list(&self) -> Vec<WorkerEntry> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .map(|id| WorkerEntry {
                worker_id: id.clone(),
                active: state.active.contains(id),
            })
            .collect()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.state.lock().known.contains(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.state.lock().active.contains(id)
    }

    /// Relay precondition: known, then active, read under one guard
    pub fn check_participant(&self, id: &str) -> Result<()> {
        let outcome = self.state.lock().membership(id);
        outcome.map_err(|reason| FedlinkError::UnregisteredWorker {
            identity: id.to_string(),
            reason,
        })
    }

    pub fn known_count(&self) -> usize {
        self.state.lock().known.len()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// `active ⊆ known` and the ordered list matches the known set
    pub fn invariants_hold(&self) -> bool {
        let state = self.state.lock();
        state.active.is_subset(&state.known)
            && state.order.len() == state.known.len()
            && state.order.iter().all(|id| state.known.contains(id))
    }

    fn mint_identity(&self) -> WorkerId {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let seq = self.mint_seq.fetch_add(1, Ordering::Relaxed);
        let digest = Sha224::digest(format!("{}:{}", nanos, seq).as_bytes());
        WorkerId::new(format!("{}{}", hex::encode(digest), UNAUTHENTICATED_SUFFIX))
    }
}
