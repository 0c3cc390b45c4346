//! Persistence driver seam
//!
//! The profile store talks to storage through this trait only. The
//! production driver is MongoDB; the in-memory driver backs dev mode and
//! tests. Both give the same guarantee the store's optimistic concurrency
//! rests on: `replace_versioned` is a single atomic compare-and-swap on the
//! stored version — it either replaces the whole document or changes
//! nothing.

use async_trait::async_trait;
use bson::Document;

use crate::types::Result;

/// Outcome of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A document with the same id already exists (lost a creation race).
    Duplicate,
}

/// Outcome of a versioned replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored version no longer matches the expected one.
    Conflict,
    /// No document with that id exists.
    Missing,
}

/// Storage operations the profile store requires.
#[async_trait]
pub trait ProfileDriver: Send + Sync {
    /// Fetch a live (not soft-deleted) document by external id.
    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Fetch all live documents matching a field-equality filter.
    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>>;

    /// Insert a new document under an external id.
    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Result<InsertOutcome>;

    /// Replace the document stored under `id` if and only if its stored
    /// version equals `expected_version`. All-or-nothing: a failed or
    /// conflicting attempt leaves the stored document untouched.
    async fn replace_versioned(
        &self,
        collection: &str,
        id: &str,
        expected_version: i64,
        doc: Document,
    ) -> Result<SaveOutcome>;

    /// Release underlying connections.
    async fn shutdown(&self) -> Result<()>;
}
