//! User profile document schema
//!
//! One document per platform user. The `linked_account` reference is set by
//! the companion web service after OAuth linking, through the same
//! versioned-save contract the bot uses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Metadata, ProfileDoc};

/// Collection name for user profiles
pub const USER_COLLECTION: &str = "users";

/// User profile stored in the document database
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserProfileDoc {
    /// Platform user id (opaque external identifier)
    pub id: String,

    /// Optimistic-concurrency version counter; increments once per
    /// successful save
    #[serde(default)]
    pub version: i64,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Linked external account id, if the user completed OAuth linking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_account: Option<String>,

    /// Per-user settings map
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl UserProfileDoc {
    /// Create a fresh profile at version 0
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            metadata: Metadata::new(),
            linked_account: None,
            settings: HashMap::new(),
        }
    }
}

impl ProfileDoc for UserProfileDoc {
    const COLLECTION: &'static str = USER_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
