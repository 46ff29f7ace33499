//! Configuration for Wicket
//!
//! CLI arguments and environment variable handling using clap, parsed once
//! at startup into an immutable [`RouteConfig`] with defaults filled in.

use clap::Parser;
use regex::Regex;
use std::net::SocketAddr;
use std::time::Duration;

use crate::types::{AuthError, Result};

/// Default name of the header carrying the authenticated username
pub const DEFAULT_HEADER_NAME: &str = "x-wicket-user";

/// Default name of the session cookie
pub const DEFAULT_COOKIE_NAME: &str = "wicket_session";

/// Default cookie lifetime (7 days)
pub const DEFAULT_COOKIE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Minimum length of the session sealing key
pub const MIN_SESSION_KEY_CHARS: usize = 32;

/// Identity header value meaning "no authenticated session"
pub const ANONYMOUS_IDENTITY: &str = "false";

/// Static-asset prefixes excluded from the auth layer by default
const DEFAULT_IGNORED_PREFIXES: [&str; 2] = ["/static/", "/assets/"];

/// Wicket - stateless cookie-session authentication gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "wicket")]
#[command(about = "Stateless cookie-session authentication gateway")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Comma-separated path prefixes that require an authenticated session
    #[arg(long, env = "PROTECTED_ROUTES", value_delimiter = ',')]
    pub protected_routes: Vec<String>,

    /// Route unauthenticated users are rewritten to
    #[arg(long, env = "CALLBACK_ROUTE", default_value = "/login")]
    pub callback_route: String,

    /// Where already-authenticated users are rewritten when they hit the
    /// callback route (disabled when unset)
    #[arg(long, env = "CALLBACK_REDIRECT")]
    pub callback_redirect: Option<String>,

    /// Name of the request header carrying the authenticated username
    #[arg(long, env = "HEADER_NAME", default_value = DEFAULT_HEADER_NAME)]
    pub header_name: String,

    /// Name of the session cookie
    #[arg(long, env = "COOKIE_NAME", default_value = DEFAULT_COOKIE_NAME)]
    pub cookie_name: String,

    /// Session cookie lifetime in seconds
    #[arg(long, env = "COOKIE_EXPIRATION_SECS", default_value_t = DEFAULT_COOKIE_TTL_SECS)]
    pub cookie_expiration_secs: u64,

    /// Whether session cookies are HTTPS-only
    #[arg(long, env = "COOKIE_SECURE", default_value = "true")]
    pub secure: bool,

    /// Key used for session sealing/unsealing (minimum 32 characters).
    /// Keep it secret; anyone holding it can mint valid sessions.
    #[arg(long, env = "SESSION_PRIVATE_KEY")]
    pub session_private_key: String,

    /// Regex deciding which paths the auth layer handles at all. Paths that
    /// do NOT match are ignored entirely. Defaults to everything except
    /// static-asset paths.
    #[arg(long, env = "IGNORED_ROUTES")]
    pub ignored_routes: Option<String>,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "main")]
    pub mongodb_db: String,

    /// MongoDB collection holding accounts
    #[arg(long, env = "MONGODB_COLLECTION", default_value = "accounts")]
    pub mongodb_collection: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    ///
    /// A short sealing key is a fatal error: tokens minted under it would be
    /// brute-forceable, so startup aborts instead of degrading.
    pub fn validate(&self) -> Result<()> {
        if self.session_private_key.chars().count() < MIN_SESSION_KEY_CHARS {
            return Err(AuthError::Config(format!(
                "session_private_key must be at least {} characters",
                MIN_SESSION_KEY_CHARS
            )));
        }

        if let Some(ref pattern) = self.ignored_routes {
            Regex::new(pattern)
                .map_err(|e| AuthError::Config(format!("Invalid ignored_routes pattern: {e}")))?;
        }

        Ok(())
    }
}

/// Matcher deciding whether a path is inside the auth layer's scope
#[derive(Debug, Clone)]
pub enum RouteMatcher {
    /// Everything is in scope except the framework static-asset paths
    Default,
    /// A path is in scope only when it matches the supplied pattern
    Pattern(Regex),
}

impl RouteMatcher {
    pub fn is_in_scope(&self, path: &str) -> bool {
        match self {
            Self::Default => {
                path != "/favicon.ico"
                    && !DEFAULT_IGNORED_PREFIXES
                        .iter()
                        .any(|prefix| path.starts_with(prefix))
            }
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

/// Immutable per-request-context configuration, built once from [`Args`]
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub protected_routes: Vec<String>,
    pub callback_route: String,
    pub callback_redirect: Option<String>,
    pub header_name: String,
    pub cookie_name: String,
    pub cookie_ttl: Duration,
    pub secure: bool,
    pub ignored_routes: RouteMatcher,
}

impl RouteConfig {
    /// Parse the runtime arguments into a route configuration
    pub fn from_args(args: &Args) -> Result<Self> {
        let ignored_routes = match &args.ignored_routes {
            Some(pattern) => RouteMatcher::Pattern(
                Regex::new(pattern).map_err(|e| {
                    AuthError::Config(format!("Invalid ignored_routes pattern: {e}"))
                })?,
            ),
            None => RouteMatcher::Default,
        };

        Ok(Self {
            protected_routes: args
                .protected_routes
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            callback_route: args.callback_route.clone(),
            callback_redirect: args.callback_redirect.clone(),
            header_name: args.header_name.clone(),
            cookie_name: args.cookie_name.clone(),
            cookie_ttl: Duration::from_secs(args.cookie_expiration_secs),
            secure: args.secure,
            ignored_routes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            listen: "127.0.0.1:8080".parse().unwrap(),
            protected_routes: vec![],
            callback_route: "/login".into(),
            callback_redirect: None,
            header_name: DEFAULT_HEADER_NAME.into(),
            cookie_name: DEFAULT_COOKIE_NAME.into(),
            cookie_expiration_secs: DEFAULT_COOKIE_TTL_SECS,
            secure: true,
            session_private_key: "0123456789abcdef0123456789abcdef".into(),
            ignored_routes: None,
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "main".into(),
            mongodb_collection: "accounts".into(),
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_short_session_key_is_fatal() {
        let mut args = base_args();
        args.session_private_key = "too-short".into();
        assert!(matches!(args.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_bad_ignored_pattern_is_fatal() {
        let mut args = base_args();
        args.ignored_routes = Some("([unclosed".into());
        assert!(matches!(args.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_default_matcher_excludes_static_assets() {
        let matcher = RouteMatcher::Default;
        assert!(matcher.is_in_scope("/dashboard"));
        assert!(matcher.is_in_scope("/login"));
        assert!(!matcher.is_in_scope("/static/app.css"));
        assert!(!matcher.is_in_scope("/assets/logo.png"));
        assert!(!matcher.is_in_scope("/favicon.ico"));
    }

    #[test]
    fn test_pattern_matcher_must_match_to_be_in_scope() {
        let matcher = RouteMatcher::Pattern(Regex::new("^/app").unwrap());
        assert!(matcher.is_in_scope("/app/settings"));
        assert!(!matcher.is_in_scope("/public/index.html"));
    }

    #[test]
    fn test_route_config_defaults() {
        let config = RouteConfig::from_args(&base_args()).unwrap();
        assert!(config.protected_routes.is_empty());
        assert_eq!(config.callback_route, "/login");
        assert!(config.callback_redirect.is_none());
        assert_eq!(config.cookie_ttl, Duration::from_secs(DEFAULT_COOKIE_TTL_SECS));
        assert!(config.secure);
    }

    #[test]
    fn test_protected_routes_trimmed_and_filtered() {
        let mut args = base_args();
        args.protected_routes = vec![" /dashboard ".into(), "".into(), "/api".into()];
        let config = RouteConfig::from_args(&args).unwrap();
        assert_eq!(config.protected_routes, vec!["/dashboard", "/api"]);
    }
}
