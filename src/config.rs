//! Configuration for Warden
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Warden - interaction core for a community-management chat bot
#[derive(Parser, Debug, Clone)]
#[command(name = "warden")]
#[command(about = "Community bot core: dispatch, prompts, permissions, versioned profiles")]
pub struct Args {
    /// Unique node identifier for this bot instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Enable development mode (runs on the in-memory store when the
    /// database is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "warden")]
    pub mongodb_db: String,

    /// Comma-separated user ids granted the developer override
    #[arg(long, env = "DEVELOPER_IDS")]
    pub developer_ids: Option<String>,

    /// Default prompt timeout in seconds
    #[arg(long, env = "PROMPT_TIMEOUT_SECONDS", default_value = "300")]
    pub prompt_timeout_seconds: u64,

    /// How long shutdown waits for in-flight interactions, in seconds
    #[arg(long, env = "DRAIN_TIMEOUT_SECONDS", default_value = "10")]
    pub drain_timeout_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Developer override identities as a set.
    pub fn developer_set(&self) -> HashSet<String> {
        self.developer_ids
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Default deadline for displayed prompts.
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_seconds)
    }

    /// Deadline for draining in-flight interactions at shutdown.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt_timeout_seconds == 0 {
            return Err("PROMPT_TIMEOUT_SECONDS must be at least 1".to_string());
        }
        if self.mongodb_uri.is_empty() {
            return Err("MONGODB_URI must not be empty".to_string());
        }
        Ok(())
    }
}
