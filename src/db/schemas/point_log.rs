//! Point log document schema
//!
//! Audit record for point mutations. References its guild by id; the guild
//! profile does not own it. The entry list and note may be amended later,
//! but `id`, `guild_id`, `created_by`, and `created_at` are fixed at
//! creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, ProfileDoc};

/// Collection name for point logs
pub const POINT_LOG_COLLECTION: &str = "point_logs";

/// One `(user, delta)` line in a point log
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PointEntry {
    /// Linked external account id the delta applies to
    pub user: String,
    pub delta: i64,
}

/// Point mutation audit record
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PointLogDoc {
    /// Generated id, fixed at creation
    pub id: String,

    /// Optimistic-concurrency version counter
    #[serde(default)]
    pub version: i64,

    #[serde(default)]
    pub metadata: Metadata,

    /// Guild this log belongs to (weak reference by id)
    pub guild_id: String,

    /// User id of whoever caused the mutation
    pub created_by: String,

    /// Creation instant, fixed at creation
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Point deltas recorded by this log
    #[serde(default)]
    pub entries: Vec<PointEntry>,

    /// Optional free-text note, amendable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PointLogDoc {
    /// Create a new log with a generated id and the current timestamp.
    pub fn new(
        guild_id: impl Into<String>,
        created_by: impl Into<String>,
        entries: Vec<PointEntry>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: 0,
            metadata: Metadata::new(),
            guild_id: guild_id.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            entries,
            note,
        }
    }
}

impl ProfileDoc for PointLogDoc {
    const COLLECTION: &'static str = POINT_LOG_COLLECTION;

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
