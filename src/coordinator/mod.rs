//! Coordinator for worker management
//!
//! Handles worker admission, the known/active registry, and relaying
//! payloads between active workers and the application.

pub mod app;
pub mod leader;
pub mod registry;
pub mod relay;

pub use app::{AppError, FederationApp, WorkerId};
pub use leader::Coordinator;
pub use registry::{Admission, Transition, WorkerEntry, WorkerRegistry, UNAUTHENTICATED_SUFFIX};
pub use relay::UpdateRelay;
