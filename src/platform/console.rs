//! Console platform client
//!
//! Stands in for a real gateway integration when running standalone (dev
//! mode, demos): every outbound acknowledgment is written to the log and
//! reported as delivered.

use async_trait::async_trait;
use tracing::info;

use super::{ComponentPrompt, Interaction, PlatformClient};
use crate::types::Result;

/// Platform client that logs acknowledgments instead of delivering them.
#[derive(Default)]
pub struct ConsoleClient;

impl ConsoleClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformClient for ConsoleClient {
    async fn reply(
        &self,
        interaction: &Interaction,
        message: &str,
        ephemeral: bool,
    ) -> Result<()> {
        info!(interaction = %interaction.id, ephemeral, "reply: {message}");
        Ok(())
    }

    async fn edit_reply(&self, interaction: &Interaction, message: &str) -> Result<()> {
        info!(interaction = %interaction.id, "edit reply: {message}");
        Ok(())
    }

    async fn show_component(
        &self,
        interaction: &Interaction,
        prompt: &ComponentPrompt,
    ) -> Result<()> {
        info!(
            interaction = %interaction.id,
            correlation_id = %prompt.correlation_id,
            options = ?prompt.options,
            "show component: {}",
            prompt.body
        );
        Ok(())
    }
}
