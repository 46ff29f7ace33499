//! Account persistence for Wicket
//!
//! The [`AccountStore`] trait is the seam between the auth layer and the
//! document store: handlers and the validator only see the trait, so tests
//! inject in-memory stores and the Mongo-backed implementation stays
//! swappable.

use bson::{doc, oid::ObjectId};
use tokio::sync::OnceCell;

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{AccountDoc, Metadata};

use crate::types::Result;

/// Account lookup and creation boundary
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Find all accounts with the given username (empty when none exist)
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountDoc>>;

    /// Insert a new account with a pre-hashed password
    async fn insert(&self, username: &str, password_hash: &str) -> Result<ObjectId>;
}

/// MongoDB-backed account store
///
/// The client handle is created on first use: concurrent first callers
/// race through the `OnceCell` and a single winner establishes the
/// connection, everyone else awaits and reuses it.
pub struct MongoAccountStore {
    uri: String,
    db_name: String,
    collection_name: String,
    client: OnceCell<MongoClient>,
}

impl MongoAccountStore {
    /// Create a store; no connection is made until the first operation
    pub fn new(uri: String, db_name: String, collection_name: String) -> Self {
        Self {
            uri,
            db_name,
            collection_name,
            client: OnceCell::new(),
        }
    }

    async fn collection(&self) -> Result<MongoCollection<AccountDoc>> {
        let client = self
            .client
            .get_or_try_init(|| MongoClient::new(&self.uri, &self.db_name))
            .await?;

        client.collection(&self.collection_name).await
    }
}

#[async_trait::async_trait]
impl AccountStore for MongoAccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Vec<AccountDoc>> {
        let collection = self.collection().await?;
        collection.find_many(doc! { "username": username }).await
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<ObjectId> {
        let collection = self.collection().await?;
        collection
            .insert_one(AccountDoc::new(username.to_string(), password_hash.to_string()))
            .await
    }
}
