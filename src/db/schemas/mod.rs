//! Database schemas for Warden
//!
//! Document structures for user profiles, guild profiles, point logs, and
//! API keys. Every document carries an external `id`, a `version` counter
//! for optimistic concurrency, and common metadata.

mod api_key;
mod guild;
mod metadata;
mod point_log;
mod user;

pub use api_key::{digest, ApiKeyDoc, API_KEY_COLLECTION};
pub use guild::{GuildMember, GuildProfileDoc, PermissionGrant, RankLock, GUILD_COLLECTION};
pub use metadata::Metadata;
pub use point_log::{PointEntry, PointLogDoc, POINT_LOG_COLLECTION};
pub use user::{UserProfileDoc, USER_COLLECTION};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Contract every persisted document implements: collection name, stable
/// external id, version counter, and mutable metadata.
pub trait ProfileDoc: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    fn metadata_mut(&mut self) -> &mut Metadata;
}

/// Collections the drivers prepare indexes for.
pub const ALL_COLLECTIONS: &[&str] = &[
    USER_COLLECTION,
    GUILD_COLLECTION,
    POINT_LOG_COLLECTION,
    API_KEY_COLLECTION,
];
