//! Guild profile document schema
//!
//! One document per guild, embedding everything that must change atomically
//! together: settings, custom permission grants, and the per-member point
//! records. The whole-document version counter guards cross-field races;
//! two writers touching different members still conflict.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Metadata, ProfileDoc};
use crate::platform::Actor;

/// Collection name for guild profiles
pub const GUILD_COLLECTION: &str = "guilds";

/// A custom permission grant: who holds an application-defined permission
/// in this guild, directly or through a role.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PermissionGrant {
    /// User ids granted directly
    #[serde(default)]
    pub users: Vec<String>,

    /// Role ids whose members hold the grant
    #[serde(default)]
    pub roles: Vec<String>,
}

impl PermissionGrant {
    /// Whether the actor matches this grant, by user id or role membership.
    pub fn holds(&self, actor: &Actor) -> bool {
        if self.users.iter().any(|u| u == &actor.user_id) {
            return true;
        }
        self.roles.iter().any(|r| actor.roles.contains(r))
    }
}

/// Rank lock on a guild member: a pinned rank with an optional expiry.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RankLock {
    pub rank: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-member record nested in the guild profile, keyed by linked external
/// account id.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GuildMember {
    /// Current points. Written only as a full replacement value.
    #[serde(default)]
    pub points: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_lock: Option<RankLock>,
}

/// Guild profile stored in the document database
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GuildProfileDoc {
    /// Platform guild id (opaque external identifier)
    pub id: String,

    /// Optimistic-concurrency version counter
    #[serde(default)]
    pub version: i64,

    #[serde(default)]
    pub metadata: Metadata,

    /// Per-guild settings map
    #[serde(default)]
    pub settings: HashMap<String, String>,

    /// Custom permission grants keyed by permission name
    #[serde(default)]
    pub custom_permissions: HashMap<String, PermissionGrant>,

    /// Member records keyed by linked external account id
    #[serde(default)]
    pub members: HashMap<String, GuildMember>,
}

impl GuildProfileDoc {
    /// Create a fresh profile at version 0
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            metadata: Metadata::new(),
            settings: HashMap::new(),
            custom_permissions: HashMap::new(),
            members: HashMap::new(),
        }
    }

    /// Look up the grant for a named custom permission.
    pub fn grant(&self, permission: &str) -> Option<&PermissionGrant> {
        self.custom_permissions.get(permission)
    }

    /// Member record for an account id, created in place when absent.
    pub fn member_mut(&mut self, account_id: &str) -> &mut GuildMember {
        self.members.entry(account_id.to_string()).or_default()
    }
}

impl ProfileDoc for GuildProfileDoc {
    const COLLECTION: &'static str = GUILD_COLLECTION;

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
