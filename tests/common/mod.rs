//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use fedlink_core::auth::{AdminCredentials, AdminGuard, Authenticator, KeyStore, WorkerKeyPair};
use fedlink_core::compression::CompressionConfig;
use fedlink_core::coordinator::AppError;
use fedlink_core::{Coordinator, FederationApp, WorkerId};

pub const PHRASE: &str = "test-phrase";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "hunter2";

/// Application that records every callback
#[derive(Default)]
pub struct RecordingApp {
    pub joined: Mutex<Vec<WorkerId>>,
    pub left: Mutex<Vec<WorkerId>>,
    pub updates: Mutex<Vec<(WorkerId, Bytes)>>,
    pub model: Mutex<Bytes>,
    pub model_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub fail_callbacks: AtomicBool,
}

impl RecordingApp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_model(model: &[u8]) -> Arc<Self> {
        let app = Self::default();
        *app.model.lock() = Bytes::copy_from_slice(model);
        Arc::new(app)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_callbacks.store(failing, Ordering::SeqCst);
    }

    pub fn joined_count(&self, id: &str) -> usize {
        self.joined.lock().iter().filter(|w| w.as_str() == id).count()
    }

    pub fn left_count(&self, id: &str) -> usize {
        self.left.lock().iter().filter(|w| w.as_str() == id).count()
    }

    pub fn callback_count(&self) -> usize {
        self.updates.lock().len()
            + self.model_calls.load(Ordering::SeqCst)
            + self.status_calls.load(Ordering::SeqCst)
    }

    fn failing(&self) -> bool {
        self.fail_callbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FederationApp for RecordingApp {
    async fn on_worker_joined(&self, worker: &WorkerId) {
        self.joined.lock().push(worker.clone());
    }

    async fn on_worker_left(&self, worker: &WorkerId) {
        self.left.lock().push(worker.clone());
    }

    async fn current_model(&self) -> Result<Bytes, AppError> {
        self.model_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing() {
            return Err(AppError::new("model unavailable"));
        }
        Ok(self.model.lock().clone())
    }

    async fn model_status(&self) -> Result<String, AppError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing() {
            return Err(AppError::new("status unavailable"));
        }
        Ok(format!("updates={}", self.updates.lock().len()))
    }

    async fn accept_update(&self, worker: &WorkerId, update: Bytes) -> Result<String, AppError> {
        if self.failing() {
            return Err(AppError::new("update rejected by application"));
        }
        self.updates.lock().push((worker.clone(), update));
        Ok("Worker update received".into())
    }
}

pub fn admin_guard() -> AdminGuard {
    AdminGuard::new(Some(AdminCredentials::new(ADMIN_USER, ADMIN_PASS)))
}

/// Coordinator in open mode
pub fn open_coordinator(app: Arc<RecordingApp>) -> Coordinator {
    Coordinator::with_parts(
        Authenticator::open(),
        admin_guard(),
        CompressionConfig::default(),
        app,
    )
}

/// Coordinator restricted to the given key pairs
pub fn restricted_coordinator(app: Arc<RecordingApp>, listed: &[&WorkerKeyPair]) -> Coordinator {
    let keys = KeyStore::from_hex_keys(listed.iter().map(|k| k.public_key_hex()))
        .expect("generated keys are valid");
    Coordinator::with_parts(
        Authenticator::key_restricted(keys, PHRASE),
        admin_guard(),
        CompressionConfig::default(),
        app,
    )
}
