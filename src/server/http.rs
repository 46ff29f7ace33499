//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Request routing order
//! matters: the credential endpoints and the health probe are matched
//! first, then every remaining request runs through the middleware
//! decision before a route is served.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::SessionCodec;
use crate::config::{Args, RouteConfig};
use crate::db::AccountStore;
use crate::middleware::{self, AuthDecision};
use crate::routes;
use crate::types::{AuthError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub config: RouteConfig,
    pub codec: SessionCodec,
    pub store: Arc<dyn AccountStore>,
}

impl AppState {
    /// Build the state, failing fast on configuration errors
    pub fn new(args: Args, store: Arc<dyn AccountStore>) -> Result<Self> {
        let config = RouteConfig::from_args(&args)?;

        // The identity header name must be a legal HTTP header
        header::HeaderName::from_bytes(config.header_name.as_bytes())
            .map_err(|e| AuthError::Config(format!("Invalid header_name: {e}")))?;

        let codec = SessionCodec::new(&args.session_private_key)?;

        Ok(Self {
            args,
            config,
            codec,
            store,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Wicket listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    mut req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Credential endpoints consume the request ahead of the middleware
    if path.starts_with("/auth") {
        return Ok(routes::handle_auth_request(req, Arc::clone(&state)).await);
    }

    // Liveness probe
    if method == Method::GET && (path == "/health" || path == "/healthz") {
        return Ok(routes::health_check());
    }

    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let token = middleware::cookie_value(cookie_header, &state.config.cookie_name);

    match middleware::decide(&state.config, &state.codec, &path, token) {
        AuthDecision::Untouched => Ok(serve_route(&state, &req, &path)),

        // The original framework's rewrite: serve the target path's content
        // under the requested URL, not an HTTP redirect
        AuthDecision::Rewrite(target) => Ok(serve_route(&state, &req, &target)),

        AuthDecision::Forward { identity } => {
            // Overwrite, never merge: any client-supplied identity header
            // must not survive into the forwarded request
            let value = AuthDecision::header_value(identity.as_deref());
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(state.config.header_name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                req.headers_mut().insert(name, value);
            }

            Ok(serve_route(&state, &req, &path))
        }
    }
}

/// Serve one of the gateway's own routes
fn serve_route(state: &AppState, req: &Request<Incoming>, path: &str) -> Response<BoxBody> {
    match (req.method(), path) {
        (&Method::GET, p) if p == state.config.callback_route => routes::handle_login_page(),
        (&Method::GET, "/api/whoami") => routes::handle_whoami(req.headers(), &state.config),
        _ => not_found_response(),
    }
}

fn not_found_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            Full::new(Bytes::from(r#"{"error":"Page Not Found"}"#))
                .map_err(|never| match never {})
                .boxed(),
        )
        .unwrap()
}
