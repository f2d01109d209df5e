//! HTTP Basic authentication in front of the admin routes

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::coordinator::Coordinator;

/// Realm advertised in `WWW-Authenticate`
pub const ADMIN_REALM: &str = "fedlink-admin";

/// Let the request through only if the admin guard accepts its credentials
pub async fn require_admin(
    State(coordinator): State<Arc<Coordinator>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = basic_credentials(req.headers())
        .map(|(user, pass)| coordinator.admin_guard().authorize(&user, &pass))
        .unwrap_or(false);

    if authorized {
        return next.run(req).await;
    }

    warn!("Rejected admin request to {} {}", req.method(), req.uri().path());
    let challenge = format!("Basic realm=\"{}\"", ADMIN_REALM);
    let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Decode `Authorization: Basic <base64(user:pass)>`
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
