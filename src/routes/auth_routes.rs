//! HTTP routes for authentication
//!
//! Provides the credential-bearing endpoints:
//! - POST /auth/login   - Verify credentials and set the session cookie
//! - POST /auth/signup  - Validate and create an account (no session)
//! - POST /auth/logout  - Clear the session cookie
//! - GET  /auth/profile - Echo the current session's username
//!
//! Logout removes the cookie from the client; it cannot invalidate a
//! still-unexpired token a client kept, which is inherent to sealed
//! stateless sessions.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{header, Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{hash_password, validate_credentials, verify_password, SessionPayload};
use crate::config::RouteConfig;
use crate::middleware::cookie_value;
use crate::server::AppState;
use crate::types::{AuthError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Maximum accepted request body size
const MAX_BODY_BYTES: usize = 10240;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full_body(json))
        .unwrap()
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn success() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: "Success".into(),
        },
    )
}

fn bad_request(error: impl Into<String>) -> Response<BoxBody> {
    json_response(
        StatusCode::BAD_REQUEST,
        &ErrorResponse { error: error.into() },
    )
}

fn unauthorized() -> Response<BoxBody> {
    json_response(
        StatusCode::UNAUTHORIZED,
        &ErrorResponse {
            error: "Unauthorized".into(),
        },
    )
}

fn internal_server_error() -> Response<BoxBody> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorResponse {
            error: "Internal Server Error".into(),
        },
    )
}

fn not_found() -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: "Page Not Found".into(),
        },
    )
}

/// Map a body-parse failure to its response: empty or malformed bodies are
/// the client's fault, a failed body read is ours
fn parse_error_response(err: &AuthError) -> Response<BoxBody> {
    match err {
        AuthError::BadRequest(_) | AuthError::Http(_) => bad_request("Bad Request"),
        _ => {
            error!("Failed to read request body: {err}");
            internal_server_error()
        }
    }
}

async fn parse_credentials(req: Request<Incoming>) -> Result<Credentials> {
    let body = req
        .collect()
        .await
        .map_err(|e| AuthError::Internal(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(AuthError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::BadRequest(format!("Invalid JSON body: {}", e)))
}

// =============================================================================
// Cookie Helpers
// =============================================================================

/// Build the Set-Cookie value carrying a freshly sealed session
fn session_cookie(config: &RouteConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        token,
        config.cookie_ttl.as_secs()
    );

    if config.secure {
        cookie.push_str("; Secure");
    }

    cookie
}

/// Build the Set-Cookie value that deletes the session cookie
fn clear_cookie(config: &RouteConfig) -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", config.cookie_name)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/login
///
/// Flow:
/// 1. Parse credentials from the JSON body
/// 2. Fetch every account under that username and verify the password
///    against each stored hash
/// 3. On any match, seal a fresh session and set it as the cookie
async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let creds: Credentials = match parse_credentials(req).await {
        Ok(c) => c,
        Err(e) => return parse_error_response(&e),
    };

    if creds.username.is_empty() || creds.password.is_empty() {
        return bad_request("Missing required fields: username, password");
    }

    let accounts = match state.store.find_by_username(&creds.username).await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Login lookup failed for {}: {}", creds.username, e);
            return internal_server_error();
        }
    };

    // Verify against every stored hash; success if any matched
    let mut matched = false;
    for account in &accounts {
        if verify_password(&creds.password, &account.password_hash) {
            matched = true;
        }
    }

    if !matched {
        warn!("Login failed: {}", creds.username);
        return unauthorized();
    }

    let payload = SessionPayload::new(creds.username.as_str(), state.config.cookie_ttl);
    let token = match state.codec.seal(&payload) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to seal session for {}: {}", creds.username, e);
            return internal_server_error();
        }
    };

    info!("Login successful: {}", creds.username);

    let mut response = success();
    if let Ok(cookie) = header::HeaderValue::from_str(&session_cookie(&state.config, &token)) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// POST /auth/signup
///
/// Runs the credential-validation pipeline, then hashes and stores the new
/// account. Does NOT create a session; the caller logs in separately.
async fn handle_signup(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let creds: Credentials = match parse_credentials(req).await {
        Ok(c) => c,
        Err(e) => return parse_error_response(&e),
    };

    if creds.username.is_empty() || creds.password.is_empty() {
        return bad_request("Missing required fields: username, password");
    }

    if let Err(message) = validate_credentials(
        &state.config,
        state.store.as_ref(),
        &creds.username,
        &creds.password,
    )
    .await
    {
        return bad_request(message);
    }

    let password_hash = match hash_password(&creds.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password for {}: {}", creds.username, e);
            return internal_server_error();
        }
    };

    match state.store.insert(&creds.username, &password_hash).await {
        Ok(_) => {
            info!("Account created: {}", creds.username);
            success()
        }
        Err(e) => {
            error!("Signup insert failed for {}: {}", creds.username, e);
            internal_server_error()
        }
    }
}

/// POST /auth/logout
///
/// Deletes the session cookie client-side, whether or not one was present.
async fn handle_logout(_req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let mut response = success();
    if let Ok(cookie) = header::HeaderValue::from_str(&clear_cookie(&state.config)) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// GET /auth/profile
///
/// Returns the username of the current valid, unexpired session.
async fn handle_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let token = cookie_value(cookie_header, &state.config.cookie_name);

    match crate::middleware::resolve_session(&state.codec, token) {
        Some(username) => json_response(StatusCode::OK, &MessageResponse { message: username }),
        None => unauthorized(),
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route an /auth/* request to its handler
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path();
    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path).to_string();
    let method = req.method().clone();

    match (&method, path.as_str()) {
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        (&Method::POST, "/auth/signup") => handle_signup(req, state).await,
        (&Method::POST, "/auth/logout") => handle_logout(req, state).await,
        (&Method::GET, "/auth/profile") => handle_profile(req, state).await,

        // Method not allowed
        (_, "/auth/login") | (_, "/auth/signup") | (_, "/auth/logout") | (_, "/auth/profile") => {
            json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &ErrorResponse {
                    error: "Method not allowed".into(),
                },
            )
        }

        // Auth endpoint not found
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    fn config() -> RouteConfig {
        let args = crate::config::Args::parse_from([
            "wicket",
            "--session-private-key",
            "0123456789abcdef0123456789abcdef",
        ]);
        RouteConfig::from_args(&args).unwrap()
    }

    #[test]
    fn test_session_cookie_shape() {
        let config = config();
        let cookie = session_cookie(&config, "sealed-token");

        assert!(cookie.starts_with("wicket_session=sealed-token"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains(&format!("Max-Age={}", 7 * 24 * 60 * 60)));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_insecure_cookie_omits_secure_flag() {
        let mut config = config();
        config.secure = false;

        assert!(!session_cookie(&config, "tok").contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_cookie(&config());
        assert!(cookie.starts_with("wicket_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_parse_error_mapping() {
        // Empty/malformed body is the client's fault
        let response = parse_error_response(&AuthError::BadRequest("empty body".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = parse_error_response(&AuthError::Http("too large".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Transport failure is ours
        let response = parse_error_response(&AuthError::Internal("connection reset".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_cookie_ttl_tracks_config() {
        let mut config = config();
        config.cookie_ttl = Duration::from_secs(60);

        assert!(session_cookie(&config, "tok").contains("Max-Age=60"));
    }
}
