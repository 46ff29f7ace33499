//! Authentication primitives for Wicket
//!
//! Provides:
//! - Session sealing/unsealing with authenticated encryption
//! - Password hashing with Argon2
//! - The ordered credential-validation pipeline used at signup

pub mod password;
pub mod session;
pub mod validate;

pub use password::{hash_password, verify_password};
pub use session::{SessionCodec, SessionPayload};
pub use validate::validate_credentials;
