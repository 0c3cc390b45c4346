//! MongoDB profile driver
//!
//! Documents are keyed by their external `id` field under a unique index,
//! one collection per profile kind. `replace_versioned` leans on MongoDB's
//! single-document atomicity: the filter carries the expected version, so
//! the replace either swaps the whole document or matches nothing.

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, IndexModel};
use tracing::{debug, info};

use async_trait::async_trait;

use super::driver::{InsertOutcome, ProfileDriver, SaveOutcome};
use super::schemas::ALL_COLLECTIONS;
use crate::types::{Result, WardenError};

/// MongoDB duplicate-key error code
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed profile driver
#[derive(Clone)]
pub struct MongoDriver {
    client: Client,
    db_name: String,
}

impl MongoDriver {
    /// Connect, verify with a ping, and prepare the unique id indexes.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Avoid hanging on an unreachable MongoDB.
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| WardenError::Database(format!("Failed to connect to MongoDB: {e}")))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| WardenError::Database(format!("MongoDB ping failed: {e}")))?;

        let driver = Self {
            client,
            db_name: db_name.to_string(),
        };
        driver.apply_indexes().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(driver)
    }

    /// Unique index on the external id of every profile collection.
    async fn apply_indexes(&self) -> Result<()> {
        for collection in ALL_COLLECTIONS {
            let index = IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(format!("{collection}_id_unique"))
                        .build(),
                )
                .build();

            self.collection(collection)
                .create_index(index)
                .await
                .map_err(|e| {
                    WardenError::Database(format!("Failed to create index on {collection}: {e}"))
                })?;
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }

    /// Filter for a live document by external id.
    fn live_filter(id: &str) -> Document {
        doc! {
            "id": id,
            "metadata.is_deleted": { "$ne": true },
        }
    }
}

#[async_trait]
impl ProfileDriver for MongoDriver {
    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.collection(collection)
            .find_one(Self::live_filter(id))
            .await
            .map_err(|e| WardenError::Database(format!("Find failed: {e}")))
    }

    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .collection(collection)
            .find(full_filter)
            .await
            .map_err(|e| WardenError::Database(format!("Find failed: {e}")))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| WardenError::Database(format!("Cursor failed: {e}")))
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Result<InsertOutcome> {
        match self.collection(collection).insert_one(doc).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) => {
                if let ErrorKind::Write(WriteFailure::WriteError(we)) = e.kind.as_ref() {
                    if we.code == DUPLICATE_KEY {
                        debug!(collection = %collection, id = %id, "Insert lost a creation race");
                        return Ok(InsertOutcome::Duplicate);
                    }
                }
                Err(WardenError::Database(format!("Insert failed: {e}")))
            }
        }
    }

    async fn replace_versioned(
        &self,
        collection: &str,
        id: &str,
        expected_version: i64,
        doc: Document,
    ) -> Result<SaveOutcome> {
        let filter = doc! { "id": id, "version": expected_version };

        let result = self
            .collection(collection)
            .replace_one(filter, doc)
            .await
            .map_err(|e| WardenError::Database(format!("Replace failed: {e}")))?;

        if result.matched_count == 1 {
            return Ok(SaveOutcome::Saved);
        }

        // No match: distinguish a version conflict from a missing document.
        let exists = self
            .collection(collection)
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| WardenError::Database(format!("Find failed: {e}")))?
            .is_some();

        Ok(if exists {
            SaveOutcome::Conflict
        } else {
            SaveOutcome::Missing
        })
    }

    async fn shutdown(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
