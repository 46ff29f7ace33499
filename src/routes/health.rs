//! Health check endpoint
//!
//! Liveness probe: returns 200 whenever the gateway is running. The account
//! store is intentionally not probed here; it connects lazily on first use.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use serde::Serialize;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Git commit the binary was built from
    pub commit: &'static str,
    /// Current timestamp
    pub timestamp: String,
}

/// GET /health
pub fn health_check() -> Response<BoxBody> {
    let body = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)).map_err(|never| match never {}).boxed())
        .unwrap()
}
