//! Worker-side logic
//!
//! HTTP client a federated worker uses to join a coordinator and
//! exchange updates with it.

pub mod client;

pub use client::{ClientConfig, WorkerClient};
