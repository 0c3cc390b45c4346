//! Interaction dispatcher
//!
//! Maps an inbound interaction to exactly one registered handler and runs
//! the authorize → cooldown → execute pipeline. Commands and static
//! components live in disjoint registries; lookup never falls through from
//! one to the other. Unknown names drop silently — the gateway already
//! filtered malformed input.
//!
//! Handlers are registered once at startup; during steady-state operation
//! the registries are read-only.

pub mod cooldown;

pub use cooldown::{CooldownSpec, CooldownTracker};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::{authorize, Decision};
use crate::bus::EventBus;
use crate::platform::{Interaction, InteractionKind, PlatformClient};
use crate::prompt::PromptCorrelator;
use crate::store::ProfileStore;
use crate::types::{Result, WardenError};

/// Denial message for a failed permission check.
const FORBIDDEN_MSG: &str = "You don't have permission to use this.";
/// Denial message for generic handler failure.
const FAILURE_MSG: &str = "Something went wrong running that. Try again later.";

/// Everything a handler may reach during execution.
#[derive(Clone)]
pub struct HandlerContext {
    pub platform: Arc<dyn PlatformClient>,
    pub store: ProfileStore,
    pub prompts: Arc<PromptCorrelator>,
    pub bus: Arc<EventBus>,
}

/// A registered slash command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Declared command name (registry key).
    fn name(&self) -> &str;

    /// Required native permission bits.
    fn required_native(&self) -> u64 {
        0
    }

    /// Required custom permission names.
    fn required_custom(&self) -> Vec<String> {
        Vec::new()
    }

    /// Cooldown windows, if any.
    fn cooldown(&self) -> Option<CooldownSpec> {
        None
    }

    async fn execute(&self, ctx: &HandlerContext, interaction: &Interaction) -> Result<()>;
}

/// A persistently registered component (button/menu) with a fixed custom
/// id, as opposed to one scoped to a single open prompt.
#[async_trait]
pub trait ComponentHandler: Send + Sync {
    /// Fixed custom id (registry key).
    fn custom_id(&self) -> &str;

    fn required_native(&self) -> u64 {
        0
    }

    fn required_custom(&self) -> Vec<String> {
        Vec::new()
    }

    async fn execute(&self, ctx: &HandlerContext, interaction: &Interaction) -> Result<()>;
}

/// Routes inbound interactions through authorize → cooldown → execute.
pub struct Dispatcher {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    components: HashMap<String, Arc<dyn ComponentHandler>>,
    cooldowns: CooldownTracker,
    developers: HashSet<String>,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(ctx: HandlerContext, developers: HashSet<String>) -> Self {
        Self {
            commands: HashMap::new(),
            components: HashMap::new(),
            cooldowns: CooldownTracker::new(),
            developers,
            ctx,
        }
    }

    /// Register a command handler. Startup only.
    pub fn register_command(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.name().to_string();
        if self.commands.insert(name.clone(), handler).is_some() {
            warn!(command = %name, "Command registered twice, keeping the newer handler");
        } else {
            info!(command = %name, "Command registered");
        }
    }

    /// Register a static component handler. Startup only.
    pub fn register_component(&mut self, handler: Arc<dyn ComponentHandler>) {
        let id = handler.custom_id().to_string();
        if self.components.insert(id.clone(), handler).is_some() {
            warn!(component = %id, "Component registered twice, keeping the newer handler");
        } else {
            info!(component = %id, "Component registered");
        }
    }

    pub fn handler_context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Run the pipeline for one inbound interaction. All outcomes are
    /// resolved here — denials and failures become exactly one
    /// acknowledgment to the actor, and nothing propagates out.
    pub async fn dispatch(&self, interaction: Arc<Interaction>) {
        match &interaction.kind {
            InteractionKind::Command { name, .. } => {
                let Some(handler) = self.commands.get(name) else {
                    debug!(command = %name, "Unknown command, dropping");
                    return;
                };
                self.run_command(Arc::clone(handler), &interaction).await;
            }
            InteractionKind::Component { custom_id, .. }
            | InteractionKind::ModalSubmit { custom_id, .. } => {
                let Some(handler) = self.components.get(custom_id) else {
                    // Prompt-scoped ids resolve via the correlator, not here.
                    debug!(custom_id = %custom_id, "No static component registered, dropping");
                    return;
                };
                self.run_component(Arc::clone(handler), &interaction).await;
            }
        }
    }

    async fn run_command(&self, handler: Arc<dyn CommandHandler>, interaction: &Interaction) {
        let name = handler.name().to_string();
        let is_developer = self.developers.contains(&interaction.actor.user_id);

        if !is_developer {
            if !self
                .authorize_interaction(
                    interaction,
                    handler.required_native(),
                    &handler.required_custom(),
                )
                .await
            {
                return;
            }

            if let Some(spec) = handler.cooldown() {
                let outcome = self.cooldowns.check_and_arm(
                    &name,
                    &interaction.actor.user_id,
                    interaction.guild_id.as_deref(),
                    &spec,
                );
                if let Err(WardenError::Cooldown { remaining_ms }) = outcome {
                    let secs = (remaining_ms / 1000).max(1);
                    self.ack(
                        interaction,
                        &format!("You're doing that too fast. Try again in {secs}s."),
                    )
                    .await;
                    return;
                }
            }
        }

        self.execute(&name, handler.execute(&self.ctx, interaction), interaction)
            .await;
    }

    async fn run_component(&self, handler: Arc<dyn ComponentHandler>, interaction: &Interaction) {
        let id = handler.custom_id().to_string();
        let is_developer = self.developers.contains(&interaction.actor.user_id);

        if !is_developer
            && !self
                .authorize_interaction(
                    interaction,
                    handler.required_native(),
                    &handler.required_custom(),
                )
                .await
        {
            return;
        }

        self.execute(&id, handler.execute(&self.ctx, interaction), interaction)
            .await;
    }

    /// Gate check with the guild profile fetched when the interaction is
    /// guild-scoped. Returns false after acknowledging the denial.
    async fn authorize_interaction(
        &self,
        interaction: &Interaction,
        required_native: u64,
        required_custom: &[String],
    ) -> bool {
        let guild = match &interaction.guild_id {
            Some(guild_id) => match self.ctx.store.get_guild(guild_id, true).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    error!(guild = %guild_id, error = %e, "Guild profile fetch failed");
                    self.ack(interaction, FAILURE_MSG).await;
                    return false;
                }
            },
            None => None,
        };

        let decision = authorize(
            &interaction.actor,
            required_native,
            required_custom,
            guild.as_ref(),
            &self.developers,
        );

        if decision == Decision::Deny {
            debug!(actor = %interaction.actor.user_id, "Authorization denied");
            self.ack(interaction, FORBIDDEN_MSG).await;
            return false;
        }
        true
    }

    /// Run a handler future, converting any error into one generic failure
    /// acknowledgment. The dispatcher itself never fails.
    async fn execute(
        &self,
        handler_name: &str,
        fut: impl std::future::Future<Output = Result<()>>,
        interaction: &Interaction,
    ) {
        if let Err(e) = fut.await {
            error!(handler = %handler_name, interaction = %interaction.id, error = %e,
                "Handler failed");
            self.ack(interaction, FAILURE_MSG).await;
        }
    }

    /// Single delivery attempt of an ephemeral acknowledgment. A transport
    /// failure here is logged and swallowed — the interaction may already
    /// be partially answered.
    async fn ack(&self, interaction: &Interaction, message: &str) {
        if let Err(e) = self.ctx.platform.reply(interaction, message, true).await {
            warn!(interaction = %interaction.id, error = %e, "Acknowledgment delivery failed");
        }
    }
}
