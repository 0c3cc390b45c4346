//! Platform client contract
//!
//! The chat platform's gateway connection, UI builders, and payload schemas
//! live outside this crate. What crosses the boundary is narrow: inbound
//! interaction objects (published onto the [`EventBus`](crate::bus::EventBus)
//! by the gateway adapter) and the outbound acknowledgment calls below.
//!
//! Outbound calls may fail with a delivery error. Callers must treat a
//! failed acknowledgment as already attempted — retrying a user-visible
//! reply risks duplicate messages.

pub mod console;
pub mod testing;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::types::Result;

/// Event name for slash-command invocations.
pub const EVENT_COMMAND: &str = "interaction.command";
/// Event name for button/component responses.
pub const EVENT_COMPONENT: &str = "interaction.component";
/// Event name for modal submissions.
pub const EVENT_MODAL: &str = "interaction.modal";
/// Event name for select-menu choices.
pub const EVENT_SELECT: &str = "interaction.select";

/// The user initiating an interaction, with the permission context the
/// platform resolved for them.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Platform user id
    pub user_id: String,
    /// Role ids the actor holds in the guild (empty outside a guild)
    pub roles: Vec<String>,
    /// Platform-granted permission bits. `None` when the member context
    /// could not be evaluated (e.g. the actor is no longer a guild member).
    pub native_permissions: Option<u64>,
}

impl Actor {
    /// Actor with no roles and no evaluable permissions (DM context).
    pub fn bare(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            native_permissions: None,
        }
    }
}

/// Typed payload of an inbound interaction.
#[derive(Debug, Clone)]
pub enum InteractionKind {
    /// Slash command invocation
    Command {
        name: String,
        options: HashMap<String, Value>,
    },
    /// Button or other message component
    Component {
        custom_id: String,
        values: Vec<String>,
    },
    /// Modal submission
    ModalSubmit {
        custom_id: String,
        fields: HashMap<String, String>,
    },
}

/// An inbound interaction delivered by the platform gateway.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Platform-assigned interaction id
    pub id: String,
    pub actor: Actor,
    /// Guild the interaction occurred in, if any
    pub guild_id: Option<String>,
    pub kind: InteractionKind,
}

impl Interaction {
    /// Bus event name this interaction is published under.
    pub fn event_name(&self) -> &'static str {
        match &self.kind {
            InteractionKind::Command { .. } => EVENT_COMMAND,
            InteractionKind::Component { .. } => EVENT_COMPONENT,
            InteractionKind::ModalSubmit { .. } => EVENT_MODAL,
        }
    }

    /// Embedded correlation/custom id, for component and modal interactions.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Command { .. } => None,
            InteractionKind::Component { custom_id, .. } => Some(custom_id),
            InteractionKind::ModalSubmit { custom_id, .. } => Some(custom_id),
        }
    }

    /// Command name, for command interactions.
    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Command { name, .. } => Some(name),
            _ => None,
        }
    }

    /// First selected value of a component response, if any.
    pub fn first_value(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Component { values, .. } => values.first().map(String::as_str),
            _ => None,
        }
    }
}

/// An interactive component to display, carrying the correlation id the
/// follow-up event will echo back.
#[derive(Debug, Clone)]
pub struct ComponentPrompt {
    /// Correlation id embedded as the component's custom id
    pub correlation_id: String,
    /// Prompt text shown with the component
    pub body: String,
    /// Option labels (button row or select entries)
    pub options: Vec<String>,
}

/// Outbound acknowledgment surface of the platform client.
///
/// Every method is a single delivery attempt; a
/// [`WardenError::Transport`](crate::types::WardenError::Transport) result
/// means the platform call failed after the attempt was already made.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Reply to an interaction. `ephemeral` replies are visible only to the
    /// actor.
    async fn reply(&self, interaction: &Interaction, message: &str, ephemeral: bool)
        -> Result<()>;

    /// Edit a previously sent reply.
    async fn edit_reply(&self, interaction: &Interaction, message: &str) -> Result<()>;

    /// Display an interactive component and return once the platform
    /// accepted it. The response arrives later as a separate interaction
    /// echoing `prompt.correlation_id`.
    async fn show_component(
        &self,
        interaction: &Interaction,
        prompt: &ComponentPrompt,
    ) -> Result<()>;
}
