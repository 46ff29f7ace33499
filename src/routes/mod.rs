//! HTTP routes for Wicket

pub mod api;
pub mod auth_routes;
pub mod health;

pub use api::{handle_login_page, handle_whoami};
pub use auth_routes::handle_auth_request;
pub use health::health_check;
