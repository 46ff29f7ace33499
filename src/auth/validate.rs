//! Credential validation pipeline for signup
//!
//! An ordered list of checks, each tagged with the field it inspects, run
//! in declaration order with short-circuit on the first failure. Format
//! checks come first so malformed input never triggers the account-store
//! lookup that the uniqueness check needs.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::config::{RouteConfig, ANONYMOUS_IDENTITY};
use crate::db::AccountStore;

/// Generic message for unexpected failures inside the pipeline; raw
/// internal errors never reach the caller.
pub const GENERIC_VALIDATION_ERROR: &str =
    "Your username or password are not formatted correctly!";

/// Letters/digits optionally followed by one underscore-plus-letters/digits
static USERNAME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+(_[a-zA-Z0-9]+)?$").unwrap());

/// Special characters counted toward password strength
const PASSWORD_SPECIALS: &str = "!@#$%^&*()";

/// Outcome of a single check: pass, or the message for the bad request
type CheckResult = std::result::Result<(), String>;

type FieldCheck = fn(&RouteConfig, &str) -> CheckResult;

/// One validation step, tagged with the field it inspects
enum CredentialCheck {
    Username(FieldCheck),
    Password(FieldCheck),
    /// Uniqueness lookup against the account store; the only async step
    ExistingAccount,
}

/// The pipeline, in execution order. Format checks precede the store
/// round trip by construction.
fn checks() -> [CredentialCheck; 3] {
    [
        CredentialCheck::Username(username_check),
        CredentialCheck::Password(password_check),
        CredentialCheck::ExistingAccount,
    ]
}

/// Run the full pipeline over a candidate username/password
///
/// Returns `Ok(())` when every check passes, or the first failing check's
/// message. Store failures inside the pipeline collapse to the generic
/// message rather than surfacing internals.
pub async fn validate_credentials(
    config: &RouteConfig,
    store: &dyn AccountStore,
    username: &str,
    password: &str,
) -> CheckResult {
    for check in checks() {
        match check {
            CredentialCheck::Username(run) => run(config, username)?,
            CredentialCheck::Password(run) => run(config, password)?,
            CredentialCheck::ExistingAccount => existing_account_check(store, username).await?,
        }
    }

    Ok(())
}

/// Reject usernames that already have an account
async fn existing_account_check(store: &dyn AccountStore, username: &str) -> CheckResult {
    match store.find_by_username(username).await {
        Ok(accounts) if !accounts.is_empty() => {
            Err("An account with this username already exists!".into())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("Existing-account check failed: {e}");
            Err(GENERIC_VALIDATION_ERROR.into())
        }
    }
}

/// Username rules: not the reserved keyword, at most one underscore,
/// alphanumeric format, length in [4, 24]
fn username_check(_config: &RouteConfig, username: &str) -> CheckResult {
    // "false" is what the identity header carries for anonymous requests;
    // an account by that name would be indistinguishable from no session
    if username == ANONYMOUS_IDENTITY {
        Err("Your username is a restricted keyword!".into())
    } else if username.split('_').count() > 2 {
        Err("Your username may only contain one underscore!".into())
    } else if !USERNAME_FORMAT.is_match(username) {
        Err("Your username may only contain letters, numbers, and one underscore.".into())
    } else if username.len() < 4 {
        Err("Your username must be at least 4 characters".into())
    } else if username.len() > 24 {
        Err("Your username cannot be longer than 24 characters".into())
    } else {
        Ok(())
    }
}

/// Password rules: no whitespace, all four character classes, length in
/// [8, 32]
fn password_check(_config: &RouteConfig, password: &str) -> CheckResult {
    if password.chars().any(char::is_whitespace) {
        Err("Your password may not contain spaces!".into())
    } else if !is_strong_password(password) {
        Err("Your password must contain at least one uppercase letter, one lowercase letter, \
             one number and one special character."
            .into())
    } else if password.len() < 8 {
        Err("Your password must be at least 8 characters!".into())
    } else if password.len() > 32 {
        Err("Your password may not be longer than 32 characters!".into())
    } else {
        Ok(())
    }
}

/// Strength = at least one special character, one uppercase letter, one
/// lowercase letter, and one digit
fn is_strong_password(password: &str) -> bool {
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_number = password.chars().any(|c| c.is_ascii_digit());

    has_special && has_uppercase && has_lowercase && has_number
}
