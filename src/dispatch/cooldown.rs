//! Command cooldown windows
//!
//! Per-(command, actor) and optionally per-(command, guild) rate limits.
//! A denied attempt reports the remaining wait and leaves the window
//! untouched — retrying early never pushes the deadline out.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::types::WardenError;

/// Cooldown declared by a command handler.
#[derive(Debug, Clone, Copy)]
pub struct CooldownSpec {
    /// Window per (command, actor)
    pub per_actor: Duration,
    /// Optional additional window per (command, guild)
    pub per_guild: Option<Duration>,
}

impl CooldownSpec {
    pub fn per_actor(window: Duration) -> Self {
        Self {
            per_actor: window,
            per_guild: None,
        }
    }
}

/// Tracks active cooldown windows keyed by (command, scope).
#[derive(Default)]
pub struct CooldownTracker {
    windows: DashMap<(String, String), Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check all applicable windows for this invocation; when clear, arm
    /// them. When still cooling, returns [`WardenError::Cooldown`] with the
    /// longest remaining wait and changes nothing.
    pub fn check_and_arm(
        &self,
        command: &str,
        actor: &str,
        guild: Option<&str>,
        spec: &CooldownSpec,
    ) -> Result<(), WardenError> {
        let now = Instant::now();

        let actor_key = (command.to_string(), format!("actor:{actor}"));
        let guild_key = guild
            .and_then(|g| spec.per_guild.map(|_| (command.to_string(), format!("guild:{g}"))));

        let mut remaining = Duration::ZERO;
        for key in [Some(&actor_key), guild_key.as_ref()].into_iter().flatten() {
            if let Some(entry) = self.windows.get(key) {
                if *entry > now {
                    remaining = remaining.max(*entry - now);
                }
            }
        }
        if remaining > Duration::ZERO {
            return Err(WardenError::Cooldown {
                remaining_ms: remaining.as_millis() as u64,
            });
        }

        self.windows.insert(actor_key, now + spec.per_actor);
        if let (Some(key), Some(window)) = (guild_key, spec.per_guild) {
            self.windows.insert(key, now + window);
        }
        Ok(())
    }

    /// Drop windows whose deadline passed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.windows.retain(|_, expiry| *expiry > now);
    }

    /// Number of tracked windows (expired ones included until purged).
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
