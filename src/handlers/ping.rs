//! Ping command

use async_trait::async_trait;

use crate::dispatch::{CommandHandler, HandlerContext};
use crate::platform::Interaction;
use crate::types::Result;

/// No requirements, no cooldown. Confirms the bot is alive.
pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    fn name(&self) -> &str {
        "ping"
    }

    async fn execute(&self, ctx: &HandlerContext, interaction: &Interaction) -> Result<()> {
        ctx.platform.reply(interaction, "Pong!", false).await
    }
}
