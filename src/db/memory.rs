//! In-memory profile driver
//!
//! Backs dev mode when no database is reachable, and the test suite. The
//! version compare-and-swap runs under one write lock per call, giving the
//! same all-or-nothing semantics the MongoDB driver gets from
//! single-document atomicity.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{Bson, Document};
use tokio::sync::RwLock;

use super::driver::{InsertOutcome, ProfileDriver, SaveOutcome};
use crate::types::Result;

type Collections = HashMap<String, HashMap<String, Document>>;

/// Driver holding all documents in process memory.
#[derive(Default)]
pub struct MemoryDriver {
    collections: RwLock<Collections>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_deleted(doc: &Document) -> bool {
    doc.get_document("metadata")
        .map(|m| m.get_bool("is_deleted").unwrap_or(false))
        .unwrap_or(false)
}

/// Field-equality match, sufficient for the filters the store issues.
fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, wanted)| match doc.get(key) {
        Some(value) => value == wanted,
        None => wanted == &Bson::Null,
    })
}

fn stored_version(doc: &Document) -> i64 {
    doc.get_i64("version")
        .or_else(|_| doc.get_i32("version").map(i64::from))
        .unwrap_or(0)
}

#[async_trait]
impl ProfileDriver for MemoryDriver {
    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .filter(|doc| !is_deleted(doc))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| !is_deleted(doc) && matches_filter(doc, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Result<InsertOutcome> {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        if entries.contains_key(id) {
            return Ok(InsertOutcome::Duplicate);
        }
        entries.insert(id.to_string(), doc);
        Ok(InsertOutcome::Inserted)
    }

    async fn replace_versioned(
        &self,
        collection: &str,
        id: &str,
        expected_version: i64,
        doc: Document,
    ) -> Result<SaveOutcome> {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();

        let Some(existing) = entries.get(id) else {
            return Ok(SaveOutcome::Missing);
        };
        if stored_version(existing) != expected_version {
            return Ok(SaveOutcome::Conflict);
        }
        entries.insert(id.to_string(), doc);
        Ok(SaveOutcome::Saved)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
