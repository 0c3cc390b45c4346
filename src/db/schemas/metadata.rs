//! Common metadata for all documents
//!
//! Tracks creation and update timestamps plus the soft-delete flag used by
//! administrative tooling. This core never deletes profiles itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Whether this document has been soft-deleted (administrative action)
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Create new metadata with current timestamps
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            updated_at: Some(Utc::now()),
            created_at: Some(Utc::now()),
        }
    }

    /// Bump the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
