//! HTTP route tests driven through the router without a socket

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{open_coordinator, restricted_coordinator, RecordingApp, ADMIN_PASS, ADMIN_USER, PHRASE};
use fedlink_core::auth::WorkerKeyPair;
use fedlink_core::compression::{self, CompressionConfig};
use fedlink_core::server::{self, INVALID_WORKER, UNREGISTERED_WORKER};
use fedlink_core::Coordinator;

fn app_router(coordinator: Coordinator) -> (Arc<Coordinator>, Router) {
    let coordinator = Arc::new(coordinator);
    (coordinator.clone(), server::router(coordinator))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_admin(mut req: Request<Body>, user: &str, pass: &str) -> Request<Body> {
    let token = STANDARD.encode(format!("{}:{}", user, pass));
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Basic {}", token).parse().unwrap(),
    );
    req
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

#[tokio::test]
async fn test_register_open_mode() {
    let (coordinator, router) = app_router(open_coordinator(RecordingApp::new()));

    let resp = router
        .oneshot(json_request(
            Method::POST,
            "/register_worker",
            json!({ "public_key_str": "", "signed_phrase": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let id = body_text(resp).await;
    assert!(id.ends_with("_unauthenticated"));
    assert!(coordinator.registry().is_active(&id));
}

#[tokio::test]
async fn test_register_rejection_returns_sentinel() {
    let listed = WorkerKeyPair::generate();
    let stranger = WorkerKeyPair::generate();
    let (_coordinator, router) =
        app_router(restricted_coordinator(RecordingApp::new(), &[&listed]));

    let resp = router
        .oneshot(json_request(
            Method::POST,
            "/register_worker",
            json!({
                "public_key_str": stranger.public_key_hex(),
                "signed_phrase": stranger.sign_phrase(PHRASE),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, INVALID_WORKER);
}

#[tokio::test]
async fn test_register_listed_key() {
    let listed = WorkerKeyPair::generate();
    let (_coordinator, router) =
        app_router(restricted_coordinator(RecordingApp::new(), &[&listed]));

    let resp = router
        .oneshot(json_request(
            Method::POST,
            "/register_worker",
            json!({
                "public_key_str": listed.public_key_hex(),
                "signed_phrase": listed.sign_phrase(PHRASE),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(body_text(resp).await, listed.public_key_hex());
}

#[tokio::test]
async fn test_malformed_register_body() {
    let (_coordinator, router) = app_router(open_coordinator(RecordingApp::new()));

    let resp = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/register_worker",
            json!({ "signed_phrase": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Malformed request:"), "{message}");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/register_worker")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed request:"));
}

#[tokio::test]
async fn test_unregistered_sentinel_on_relay_routes() {
    let app = RecordingApp::new();
    let (_coordinator, router) = app_router(open_coordinator(app.clone()));

    let resp = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/query_global_model_status",
            json!({ "worker_id": "ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, UNREGISTERED_WORKER);

    let resp = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/return_global_model",
            json!({ "worker_id": "ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_text(resp).await, UNREGISTERED_WORKER);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/receive_worker_update/ghost")
        .body(Body::from("payload"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(body_text(resp).await, UNREGISTERED_WORKER);

    assert_eq!(app.callback_count(), 0);
}

#[tokio::test]
async fn test_update_and_model_over_http() {
    let app = RecordingApp::with_model(b"weights");
    let (coordinator, router) = app_router(open_coordinator(app.clone()));
    let id = coordinator.register_worker("", "").await.unwrap();

    let payload = compression::compress(b"delta", &CompressionConfig::default()).unwrap();
    let req = Request::builder()
        .method(Method::POST)
        .uri(format!("/receive_worker_update/{}", id))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(payload))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "Worker update received");
    assert_eq!(app.updates.lock()[0].1.as_ref(), b"delta");

    let resp = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/return_global_model",
            json!({ "worker_id": id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let model = compression::decompress(&bytes, &CompressionConfig::default()).unwrap();
    assert_eq!(model.as_ref(), b"weights");

    // Undecodable payload is an error response, not a sentinel
    let req = Request::builder()
        .method(Method::POST)
        .uri(format!("/receive_worker_update/{}", id))
        .body(Body::from("garbage"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_ne!(body_text(resp).await, UNREGISTERED_WORKER);
}

#[tokio::test]
async fn test_admin_requires_credentials() {
    let (_coordinator, router) = app_router(open_coordinator(RecordingApp::new()));

    let req = Request::builder().uri("/workers").body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let req = with_admin(
        Request::builder().uri("/workers").body(Body::empty()).unwrap(),
        ADMIN_USER,
        "wrong",
    );
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_crud() {
    let app = RecordingApp::new();
    let (coordinator, router) = app_router(open_coordinator(app.clone()));

    let req = with_admin(
        json_request(Method::POST, "/workers", json!({ "public_key_str": "w1", "active": true })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "worker_id": "w1", "active": true }));
    assert_eq!(app.joined_count("w1"), 1);

    let req = with_admin(
        json_request(Method::POST, "/workers", json!({ "public_key_str": "w1" })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = with_admin(
        json_request(Method::POST, "/workers", json!({ "active": true })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "Malformed request: Public key was not passed in input" })
    );

    let req = with_admin(
        json_request(Method::PUT, "/workers/w1", json!({ "active": "yes" })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(coordinator.registry().is_active("w1"));

    let req = with_admin(
        json_request(Method::PUT, "/workers/w1", json!({ "active": false })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.left_count("w1"), 1);

    let req = with_admin(
        json_request(Method::PUT, "/workers/ghost", json!({ "active": true })),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = with_admin(
        Request::builder().uri("/workers").body(Body::empty()).unwrap(),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(body_json(resp).await, json!([{ "worker_id": "w1", "active": false }]));

    let req = with_admin(
        Request::builder()
            .method(Method::DELETE)
            .uri("/workers/w1")
            .body(Body::empty())
            .unwrap(),
        ADMIN_USER,
        ADMIN_PASS,
    );
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(coordinator.admin_list().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_coordinator, router) = app_router(open_coordinator(RecordingApp::new()));
    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("fedlink_"));
}
