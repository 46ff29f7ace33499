//! Account document schema
//!
//! Stores a username and its password hash. Accounts are created at signup
//! and read at login; this layer never updates or deletes them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Username (the business key)
    pub username: String,

    /// Argon2 password hash
    pub password_hash: String,
}

impl AccountDoc {
    /// Create a new account document
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            username,
            password_hash,
        }
    }
}

impl IntoIndexes for AccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        // Unique index on username: the validator's check-then-insert has
        // no transactional guard, so racing signups resolve here
        vec![(
            doc! { "username": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for AccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
