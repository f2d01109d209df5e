//! HTTP transport
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/register_worker` | POST | Authenticate and admit a worker |
//! | `/receive_worker_update/:worker_id` | POST | Compressed update from a worker |
//! | `/query_global_model_status` | POST | Global model status |
//! | `/return_global_model` | POST | Compressed global model |
//! | `/workers` | GET, POST | Admin: list / add workers |
//! | `/workers/:worker_id` | PUT, DELETE | Admin: set status / remove |
//! | `/metrics` | GET | Prometheus metrics |
//!
//! Worker-facing routes answer `200` with a sentinel body when a request
//! is refused for identity reasons, so a worker can tell "register again"
//! apart from a server fault.

mod admin_auth;
mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::error::{FedlinkError, Result};

pub use admin_auth::{basic_credentials, ADMIN_REALM};

/// Body returned when registration is refused
pub const INVALID_WORKER: &str = "INVALID_WORKER";

/// Body returned when a relay request comes from an unknown or inactive worker
pub const UNREGISTERED_WORKER: &str = "UNREGISTERED_WORKER";

pub const REGISTER_WORKER_ROUTE: &str = "/register_worker";
pub const RECEIVE_WORKER_UPDATE_ROUTE: &str = "/receive_worker_update";
pub const QUERY_GLOBAL_MODEL_STATUS_ROUTE: &str = "/query_global_model_status";
pub const RETURN_GLOBAL_MODEL_ROUTE: &str = "/return_global_model";
pub const WORKERS_ROUTE: &str = "/workers";

/// Largest compressed update body accepted (256 MiB)
pub const MAX_UPDATE_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Build the full router
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let admin = Router::new()
        .route(WORKERS_ROUTE, get(routes::list_workers).post(routes::add_worker))
        .route(
            "/workers/:worker_id",
            put(routes::set_worker_status).delete(routes::remove_worker),
        )
        .route_layer(middleware::from_fn_with_state(
            coordinator.clone(),
            admin_auth::require_admin,
        ));

    Router::new()
        .route(REGISTER_WORKER_ROUTE, post(routes::register_worker))
        .route(
            "/receive_worker_update/:worker_id",
            post(routes::receive_worker_update)
                .layer(DefaultBodyLimit::max(MAX_UPDATE_BODY_BYTES)),
        )
        .route(QUERY_GLOBAL_MODEL_STATUS_ROUTE, post(routes::query_global_model_status))
        .route(RETURN_GLOBAL_MODEL_ROUTE, post(routes::return_global_model))
        .route("/metrics", get(routes::metrics))
        .merge(admin)
        .layer(CorsLayer::permissive())
        .with_state(coordinator)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, coordinator: Arc<Coordinator>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().map_err(|e| FedlinkError::Internal {
        message: format!("listener has no local address: {}", e),
    })?;
    info!("Coordinator listening on {} ({} mode)", addr, coordinator.mode());

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| FedlinkError::Internal {
            message: format!("server error: {}", e),
        })
}
