//! Recording platform client for tests
//!
//! Captures every outbound acknowledgment so tests can assert on exactly
//! what the actor would have seen, and can be switched to fail deliveries
//! to exercise transport-error paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{ComponentPrompt, Interaction, PlatformClient};
use crate::types::{Result, WardenError};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    Reply {
        interaction_id: String,
        message: String,
        ephemeral: bool,
    },
    EditReply {
        interaction_id: String,
        message: String,
    },
    ShowComponent {
        interaction_id: String,
        correlation_id: String,
    },
}

/// Platform client that records acknowledgments instead of delivering them.
#[derive(Default)]
pub struct RecordingClient {
    acks: Mutex<Vec<Ack>>,
    fail_deliveries: AtomicBool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail with a transport error.
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of everything sent so far.
    pub fn acks(&self) -> Vec<Ack> {
        self.acks.lock().expect("lock poisoned").clone()
    }

    /// Number of acknowledgments sent so far.
    pub fn ack_count(&self) -> usize {
        self.acks.lock().expect("lock poisoned").len()
    }

    fn record(&self, ack: Ack) -> Result<()> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(WardenError::Transport("delivery refused (test)".into()));
        }
        self.acks.lock().expect("lock poisoned").push(ack);
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for RecordingClient {
    async fn reply(
        &self,
        interaction: &Interaction,
        message: &str,
        ephemeral: bool,
    ) -> Result<()> {
        self.record(Ack::Reply {
            interaction_id: interaction.id.clone(),
            message: message.to_string(),
            ephemeral,
        })
    }

    async fn edit_reply(&self, interaction: &Interaction, message: &str) -> Result<()> {
        self.record(Ack::EditReply {
            interaction_id: interaction.id.clone(),
            message: message.to_string(),
        })
    }

    async fn show_component(
        &self,
        interaction: &Interaction,
        prompt: &ComponentPrompt,
    ) -> Result<()> {
        self.record(Ack::ShowComponent {
            interaction_id: interaction.id.clone(),
            correlation_id: prompt.correlation_id.clone(),
        })
    }
}
