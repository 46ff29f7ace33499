//! Database schemas for Wicket
//!
//! Defines the MongoDB document structure for accounts.

mod account;
mod metadata;

pub use account::AccountDoc;
pub use metadata::Metadata;
