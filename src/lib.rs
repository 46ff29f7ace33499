//! Wicket - stateless cookie-session authentication layer
//!
//! Wicket issues and verifies tamper-proof session tokens carried in a
//! cookie, decides per-request whether a route requires authentication,
//! and validates new-account credentials before persisting them. There is
//! no server-side session table: login state lives entirely inside a
//! sealed token.
//!
//! ## Components
//!
//! - **Session codec**: ChaCha20-Poly1305 sealed tokens ([`auth::session`])
//! - **Password hashing**: Argon2id ([`auth::password`])
//! - **Credential validation**: ordered short-circuit pipeline
//!   ([`auth::validate`])
//! - **Middleware**: route classification and the per-request auth
//!   decision ([`middleware`])
//! - **Account store**: MongoDB-backed, trait-injectable ([`db`])
//! - **Gateway**: hyper server hosting `/auth/*` and applying the
//!   middleware ([`server`])

pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use config::{Args, RouteConfig};
pub use server::{run, AppState};
pub use types::{AuthError, Result};
