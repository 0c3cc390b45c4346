//! Points management command
//!
//! `/points set` overwrites a member's points after an inline confirmation
//! prompt restricted to the invoking actor. The template for handlers that
//! combine a prompt round-trip with a versioned store write.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::dispatch::{CommandHandler, CooldownSpec, HandlerContext};
use crate::db::schemas::PointEntry;
use crate::platform::{ComponentPrompt, Interaction, EVENT_COMPONENT};
use crate::prompt::new_correlation_id;
use crate::types::{Result, WardenError};

const CONFIRM: &str = "confirm";
const CANCEL: &str = "cancel";

/// Custom permission required to mutate points.
pub const MANAGE_POINTS: &str = "manage-points";

/// Sets a member's points to an absolute value.
pub struct PointsSetCommand {
    prompt_timeout: Duration,
}

impl PointsSetCommand {
    pub fn new(prompt_timeout: Duration) -> Self {
        Self { prompt_timeout }
    }
}

impl Default for PointsSetCommand {
    fn default() -> Self {
        Self::new(crate::prompt::DEFAULT_PROMPT_TIMEOUT)
    }
}

#[async_trait]
impl CommandHandler for PointsSetCommand {
    fn name(&self) -> &str {
        "points"
    }

    fn required_custom(&self) -> Vec<String> {
        vec![MANAGE_POINTS.to_string()]
    }

    fn cooldown(&self) -> Option<CooldownSpec> {
        Some(CooldownSpec::per_actor(Duration::from_secs(5)))
    }

    async fn execute(&self, ctx: &HandlerContext, interaction: &Interaction) -> Result<()> {
        let guild_id = interaction
            .guild_id
            .as_deref()
            .ok_or_else(|| WardenError::InvalidInput("points requires a guild".into()))?;

        let options = match &interaction.kind {
            crate::platform::InteractionKind::Command { options, .. } => options,
            _ => return Err(WardenError::InvalidInput("not a command".into())),
        };
        let target = options
            .get("user")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WardenError::InvalidInput("missing user option".into()))?;
        let amount = options
            .get("amount")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| WardenError::InvalidInput("missing amount option".into()))?;

        // Confirmation prompt only the invoker may answer.
        let correlation_id = new_correlation_id();
        ctx.platform
            .show_component(
                interaction,
                &ComponentPrompt {
                    correlation_id: correlation_id.clone(),
                    body: format!("Set {target}'s points to {amount}?"),
                    options: vec![CONFIRM.to_string(), CANCEL.to_string()],
                },
            )
            .await?;

        let allowed = vec![interaction.actor.user_id.clone()];
        let response = match ctx
            .prompts
            .await_response(EVENT_COMPONENT, &correlation_id, &allowed, self.prompt_timeout)
            .await
        {
            Ok(response) => response,
            Err(WardenError::Timeout) => {
                // Normal outcome, not a failure.
                if let Err(e) = ctx
                    .platform
                    .edit_reply(interaction, "Confirmation timed out, nothing changed.")
                    .await
                {
                    warn!(error = %e, "Timeout notice delivery failed");
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if response.first_value() != Some(CONFIRM) {
            return ctx
                .platform
                .edit_reply(interaction, "Cancelled, nothing changed.")
                .await;
        }

        // First-committer-wins: on a conflict, re-run once against the
        // fresh version before surfacing failure.
        let actor = &interaction.actor.user_id;
        let saved = match ctx.store.set_points(guild_id, target, amount, actor).await {
            Err(WardenError::Conflict { .. }) => {
                ctx.store.set_points(guild_id, target, amount, actor).await
            }
            other => other,
        };
        saved?;

        ctx.store
            .create_point_log(
                guild_id,
                actor,
                vec![PointEntry {
                    user: target.to_string(),
                    delta: amount,
                }],
                None,
            )
            .await?;

        info!(guild = %guild_id, user = %target, amount, "Points updated");
        ctx.platform
            .edit_reply(interaction, &format!("{target} now has {amount} points."))
            .await
    }
}
