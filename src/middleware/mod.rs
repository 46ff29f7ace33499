//! Per-request auth decision engine
//!
//! Pure functions over `(path, configuration, cookie)`: classify the route,
//! resolve the session from the cookie, and produce exactly one
//! [`AuthDecision`] per request. The HTTP layer applies the decision; the
//! logic here never touches a request object.

use crate::auth::SessionCodec;
use crate::config::{RouteConfig, ANONYMOUS_IDENTITY};

/// Classification of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Path fails the ignored-routes gate; the auth layer does nothing at
    /// all, not even header injection
    OutOfScope,
    /// Path is handled by the auth layer. Protected and callback are not
    /// mutually exclusive; the decision table resolves precedence.
    InScope { protected: bool, callback: bool },
}

/// The single action the middleware takes for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Out of scope: request proceeds untouched, no header
    Untouched,
    /// Serve the target path instead of the requested one
    Rewrite(String),
    /// Pass the request through with the identity header set to the
    /// username, or `"false"` when no session resolved
    Forward { identity: Option<String> },
}

impl AuthDecision {
    /// Value the identity header carries for a forwarded request
    pub fn header_value(identity: Option<&str>) -> &str {
        identity.unwrap_or(ANONYMOUS_IDENTITY)
    }
}

/// Classify a path against the route configuration
pub fn classify(path: &str, config: &RouteConfig) -> RouteClass {
    if !config.ignored_routes.is_in_scope(path) {
        return RouteClass::OutOfScope;
    }

    RouteClass::InScope {
        protected: config
            .protected_routes
            .iter()
            .any(|route| path.starts_with(route.as_str())),
        callback: path.starts_with(config.callback_route.as_str()),
    }
}

/// Resolve the username from an optional session cookie value
///
/// Missing cookie, invalid token, and expired token all collapse to `None`.
/// Validity is authenticity AND not-expired, evaluated in that order.
pub fn resolve_session(codec: &SessionCodec, cookie_value: Option<&str>) -> Option<String> {
    let payload = codec.unseal(cookie_value?)?;

    if payload.is_expired() {
        return None;
    }

    Some(payload.username)
}

/// Decide the action for one in-scope request
///
/// Precedence: an unauthenticated hit on a protected path rewrites to the
/// callback route; an authenticated hit on the callback route rewrites to
/// the configured redirect (when enabled); everything else forwards with
/// the identity header.
pub fn decide(
    config: &RouteConfig,
    codec: &SessionCodec,
    path: &str,
    cookie_value: Option<&str>,
) -> AuthDecision {
    let RouteClass::InScope { protected, callback } = classify(path, config) else {
        return AuthDecision::Untouched;
    };

    let session = resolve_session(codec, cookie_value);

    if session.is_none() && protected {
        return AuthDecision::Rewrite(config.callback_route.clone());
    }

    if session.is_some() && callback {
        if let Some(redirect) = &config.callback_redirect {
            return AuthDecision::Rewrite(redirect.clone());
        }
    }

    AuthDecision::Forward { identity: session }
}

/// Extract a named cookie's value from a `Cookie` request header
pub fn cookie_value<'a>(header: Option<&'a str>, name: &str) -> Option<&'a str> {
    let header = header?;

    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionPayload;
    use crate::config::Args;
    use clap::Parser;
    use std::time::Duration;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn config_with(protected: &str, redirect: Option<&str>) -> RouteConfig {
        let mut argv = vec![
            "wicket".to_string(),
            "--session-private-key".into(),
            KEY.into(),
            "--protected-routes".into(),
            protected.into(),
        ];
        if let Some(redirect) = redirect {
            argv.push("--callback-redirect".into());
            argv.push(redirect.into());
        }

        let args = Args::parse_from(argv);
        RouteConfig::from_args(&args).unwrap()
    }

    fn codec() -> SessionCodec {
        SessionCodec::new(KEY).unwrap()
    }

    fn live_token(codec: &SessionCodec, username: &str) -> String {
        codec
            .seal(&SessionPayload::new(username, Duration::from_secs(3600)))
            .unwrap()
    }

    #[test]
    fn test_classify_protected_and_callback() {
        let config = config_with("/dashboard", None);

        assert_eq!(
            classify("/dashboard/settings", &config),
            RouteClass::InScope {
                protected: true,
                callback: false
            }
        );
        assert_eq!(
            classify("/login", &config),
            RouteClass::InScope {
                protected: false,
                callback: true
            }
        );
        assert_eq!(classify("/static/app.css", &config), RouteClass::OutOfScope);
    }

    #[test]
    fn test_protected_without_session_rewrites_to_login() {
        let config = config_with("/dashboard", None);
        let decision = decide(&config, &codec(), "/dashboard", None);
        assert_eq!(decision, AuthDecision::Rewrite("/login".into()));
    }

    #[test]
    fn test_protected_with_session_forwards_identity() {
        let config = config_with("/dashboard", None);
        let codec = codec();
        let token = live_token(&codec, "alice");

        let decision = decide(&config, &codec, "/dashboard", Some(&token));
        assert_eq!(
            decision,
            AuthDecision::Forward {
                identity: Some("alice".into())
            }
        );
    }

    #[test]
    fn test_callback_with_session_rewrites_when_redirect_enabled() {
        let config = config_with("/dashboard", Some("/home"));
        let codec = codec();
        let token = live_token(&codec, "alice");

        let decision = decide(&config, &codec, "/login", Some(&token));
        assert_eq!(decision, AuthDecision::Rewrite("/home".into()));
    }

    #[test]
    fn test_callback_with_session_forwards_when_redirect_disabled() {
        let config = config_with("/dashboard", None);
        let codec = codec();
        let token = live_token(&codec, "alice");

        let decision = decide(&config, &codec, "/login", Some(&token));
        assert_eq!(
            decision,
            AuthDecision::Forward {
                identity: Some("alice".into())
            }
        );
    }

    #[test]
    fn test_ignored_path_is_untouched_regardless_of_session() {
        let config = config_with("/dashboard", None);
        let codec = codec();
        let token = live_token(&codec, "alice");

        assert_eq!(
            decide(&config, &codec, "/static/app.css", Some(&token)),
            AuthDecision::Untouched
        );
        assert_eq!(
            decide(&config, &codec, "/static/app.css", None),
            AuthDecision::Untouched
        );
    }

    #[test]
    fn test_expired_session_counts_as_no_session() {
        let config = config_with("/dashboard", None);
        let codec = codec();
        let expired = codec
            .seal(&SessionPayload {
                username: "alice".into(),
                expires_at: 0,
            })
            .unwrap();

        let decision = decide(&config, &codec, "/dashboard", Some(&expired));
        assert_eq!(decision, AuthDecision::Rewrite("/login".into()));
    }

    #[test]
    fn test_tampered_cookie_counts_as_no_session() {
        let config = config_with("/dashboard", None);
        let codec = codec();

        let decision = decide(&config, &codec, "/dashboard", Some("garbage-token"));
        assert_eq!(decision, AuthDecision::Rewrite("/login".into()));
    }

    #[test]
    fn test_unprotected_path_without_session_forwards_anonymous() {
        let config = config_with("/dashboard", None);

        let decision = decide(&config, &codec(), "/about", None);
        assert_eq!(decision, AuthDecision::Forward { identity: None });
        assert_eq!(AuthDecision::header_value(None), "false");
    }

    #[test]
    fn test_cookie_value_extraction() {
        assert_eq!(
            cookie_value(Some("a=1; wicket_session=tok; b=2"), "wicket_session"),
            Some("tok")
        );
        assert_eq!(cookie_value(Some("a=1; b=2"), "wicket_session"), None);
        assert_eq!(cookie_value(None, "wicket_session"), None);
    }
}
