//! Route handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{INVALID_WORKER, UNREGISTERED_WORKER};
use crate::coordinator::{Coordinator, WorkerId};
use crate::error::FedlinkError;

type AppState = State<Arc<Coordinator>>;

// ════════════════════════════════════════════════════════════════════════════
// REQUEST TYPES
// ════════════════════════════════════════════════════════════════════════════

/// Registration body
#[derive(Debug, Deserialize)]
pub struct RegisterWorkerReq {
    pub public_key_str: String,
    pub signed_phrase: String,
}

/// Body of status and model queries
#[derive(Debug, Deserialize)]
pub struct WorkerQueryReq {
    pub worker_id: String,
}

// ════════════════════════════════════════════════════════════════════════════
// RESPONSE HELPERS
// ════════════════════════════════════════════════════════════════════════════

fn malformed(reason: impl Into<String>) -> Response {
    let err = FedlinkError::MalformedRequest {
        reason: reason.into(),
    };
    warn!("{}", err);
    json_error(err)
}

fn error_status(err: &FedlinkError) -> StatusCode {
    match err {
        FedlinkError::AlreadyExists { .. } => StatusCode::CONFLICT,
        FedlinkError::UnknownWorker { .. } => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Relay failures: sentinel for membership, text for everything else
fn relay_error(err: FedlinkError) -> Response {
    if err.is_unregistered() {
        return UNREGISTERED_WORKER.into_response();
    }
    (error_status(&err), err.to_string()).into_response()
}

/// `{"error": ...}` body with the status for the error kind
fn json_error(err: FedlinkError) -> Response {
    (error_status(&err), Json(json!({ "error": err.to_string() }))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// WORKER ROUTES
// ════════════════════════════════════════════════════════════════════════════

pub async fn register_worker(
    State(coordinator): AppState,
    payload: Result<Json<RegisterWorkerReq>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match coordinator
        .register_worker(&req.public_key_str, &req.signed_phrase)
        .await
    {
        Ok(id) => id.into_string().into_response(),
        Err(_) => INVALID_WORKER.into_response(),
    }
}

pub async fn receive_worker_update(
    State(coordinator): AppState,
    Path(worker_id): Path<String>,
    body: Bytes,
) -> Response {
    match coordinator.submit_update(&worker_id, body).await {
        Ok(reply) => reply.into_response(),
        Err(e) => relay_error(e),
    }
}

pub async fn query_global_model_status(
    State(coordinator): AppState,
    payload: Result<Json<WorkerQueryReq>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match coordinator.query_status(&req.worker_id).await {
        Ok(status) => status.into_response(),
        Err(e) => relay_error(e),
    }
}

pub async fn return_global_model(
    State(coordinator): AppState,
    payload: Result<Json<WorkerQueryReq>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match coordinator.fetch_model(&req.worker_id).await {
        Ok(model) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            model,
        )
            .into_response(),
        Err(e) => relay_error(e),
    }
}

pub async fn metrics() -> String {
    crate::metrics::gather_system_metrics()
}

// ════════════════════════════════════════════════════════════════════════════
// ADMIN ROUTES
// ════════════════════════════════════════════════════════════════════════════

pub async fn list_workers(State(coordinator): AppState) -> Response {
    Json(coordinator.admin_list()).into_response()
}

pub async fn add_worker(
    State(coordinator): AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    let worker_id = match body.get("public_key_str") {
        None => return malformed("Public key was not passed in input"),
        Some(Value::String(key)) if !key.is_empty() => key.clone(),
        Some(_) => return malformed("Public key must be a non-empty string"),
    };

    let active = match body.get("active") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(active)) => *active,
        Some(other) => return malformed(format!("Key 'active' should be a boolean: {}", other)),
    };

    match coordinator.admin_add(WorkerId::from(worker_id), active).await {
        Ok(entry) => Json(entry).into_response(),
        Err(e) => json_error(e),
    }
}

pub async fn remove_worker(
    State(coordinator): AppState,
    Path(worker_id): Path<String>,
) -> StatusCode {
    coordinator.admin_remove(&worker_id).await;
    StatusCode::NO_CONTENT
}

pub async fn set_worker_status(
    State(coordinator): AppState,
    Path(worker_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    let active = match body.get("active") {
        None => return malformed("Key 'active' is missing in payload"),
        Some(Value::Bool(active)) => *active,
        Some(other) => return malformed(format!("Key 'active' should be a boolean: {}", other)),
    };

    match coordinator.admin_set_active(&worker_id, active).await {
        Ok(entry) => Json(entry).into_response(),
        Err(e) => json_error(e),
    }
}
