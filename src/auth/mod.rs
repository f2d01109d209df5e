//! Worker and administrator authentication
//!
//! Key list loading, signature checks on registration, the admin
//! credential gate, and worker-side key handling.

pub mod admin;
pub mod authenticator;
pub mod key_store;
pub mod keys;

pub use admin::{AdminCredentials, AdminGuard};
pub use authenticator::{AuthOutcome, AuthenticationMode, Authenticator, DEFAULT_AUTH_PHRASE};
pub use key_store::KeyStore;
pub use keys::WorkerKeyPair;
