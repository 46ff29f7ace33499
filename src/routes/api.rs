//! Downstream demonstration routes for the gateway binary
//!
//! These sit behind the middleware and show both sides of its contract:
//! `/api/whoami` reads the injected identity header, and the login page is
//! what protected-route rewrites land on.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;

use crate::config::{RouteConfig, ANONYMOUS_IDENTITY};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

#[derive(Serialize)]
struct WhoamiResponse {
    user: String,
}

#[derive(Serialize)]
struct LoginPageResponse {
    message: &'static str,
}

fn json_body<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)).map_err(|never| match never {}).boxed())
        .unwrap()
}

/// GET /api/whoami
///
/// Echoes the identity header the middleware injected. The header is
/// trustworthy here precisely because the middleware overwrites any
/// client-supplied value before forwarding.
pub fn handle_whoami(headers: &HeaderMap, config: &RouteConfig) -> Response<BoxBody> {
    let user = headers
        .get(config.header_name.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ANONYMOUS_IDENTITY)
        .to_string();

    json_body(StatusCode::OK, &WhoamiResponse { user })
}

/// The callback-route page unauthenticated users are rewritten to
pub fn handle_login_page() -> Response<BoxBody> {
    json_body(
        StatusCode::OK,
        &LoginPageResponse {
            message: "Authentication required",
        },
    )
}
