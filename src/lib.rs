//! Fedlink Core - worker identity and membership for federated training
//!
//! This crate provides the Rust core for coordinating:
//! - Worker authentication against a fixed key list
//! - The known/active worker registry
//! - Relaying compressed updates and model snapshots
//! - The admin API for provisioning workers

pub mod auth;
pub mod compression;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod server;
pub mod worker;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, FederationApp, WorkerId};
pub use error::{FedlinkError, Result};
