//! API key document schema
//!
//! Guild-scoped credentials for programmatic access. The key value is
//! stored only as a SHA-256 digest; the plaintext is generated once,
//! returned to the caller, and never persisted.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Metadata, ProfileDoc};

/// Collection name for API keys
pub const API_KEY_COLLECTION: &str = "api_keys";

/// Prefix identifying Warden-issued keys in the plaintext form
const KEY_PREFIX: &str = "wdn_";

/// API key stored in the document database
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ApiKeyDoc {
    /// Generated key id, fixed at creation
    pub id: String,

    /// Optimistic-concurrency version counter
    #[serde(default)]
    pub version: i64,

    #[serde(default)]
    pub metadata: Metadata,

    /// Guild this key is scoped to
    pub guild_id: String,

    /// Human-readable name for the key
    pub name: String,

    /// Permission scopes granted by this key
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Whether the key is accepted for authentication
    #[serde(default)]
    pub enabled: bool,

    /// SHA-256 hex digest of the plaintext key
    pub key_digest: String,
}

impl ApiKeyDoc {
    /// Generate a new key. Returns the document and the plaintext; the
    /// plaintext cannot be recovered afterwards.
    pub fn generate(
        guild_id: impl Into<String>,
        name: impl Into<String>,
        scopes: Vec<String>,
    ) -> (Self, String) {
        let mut material = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut material);
        let plaintext = format!("{KEY_PREFIX}{}", hex::encode(material));

        let doc = Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: 0,
            metadata: Metadata::new(),
            guild_id: guild_id.into(),
            name: name.into(),
            scopes,
            enabled: true,
            key_digest: digest(&plaintext),
        };
        (doc, plaintext)
    }

    /// Whether a presented plaintext matches this key. Disabled keys never
    /// match.
    pub fn matches(&self, presented: &str) -> bool {
        self.enabled && digest(presented) == self.key_digest
    }
}

/// SHA-256 hex digest of a plaintext key.
pub fn digest(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

impl ProfileDoc for ApiKeyDoc {
    const COLLECTION: &'static str = API_KEY_COLLECTION;

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
