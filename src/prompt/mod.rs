//! Prompt correlator — rendezvous between a displayed component and its
//! follow-up event
//!
//! A handler that shows a modal, select, or button row embeds a generated
//! correlation id in the component and then suspends on
//! [`PromptCorrelator::await_response`]. The correlator registers one bus
//! subscription, matches follow-up events solely by the embedded id, and
//! resolves the waiting handler exactly once — either with the matching
//! event or with [`WardenError::Timeout`].
//!
//! Responses from users outside a non-empty allow-list are acknowledged to
//! the responder and otherwise ignored: the wait continues, the slot is not
//! consumed, and no subscription leaks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::platform::{Interaction, PlatformClient};
use crate::types::{Result, WardenError};

/// Default deadline for a displayed prompt.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Reply sent to a user who responds to somebody else's prompt.
const NOT_YOUR_PROMPT: &str = "This prompt is not for you.";

/// Generate a correlation id with enough entropy to avoid collision across
/// concurrently open prompts.
pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Correlates displayed components with their follow-up events over the
/// event bus.
pub struct PromptCorrelator {
    bus: Arc<EventBus>,
    platform: Arc<dyn PlatformClient>,
}

impl PromptCorrelator {
    pub fn new(bus: Arc<EventBus>, platform: Arc<dyn PlatformClient>) -> Self {
        Self { bus, platform }
    }

    /// Suspend until a follow-up event on `event_name` arrives whose
    /// embedded custom id equals `correlation_id`, or until `timeout`
    /// elapses.
    ///
    /// `allowed_users` restricts who may resolve the prompt; an empty slice
    /// means anyone. Exactly one of the two outcomes fires, even when a
    /// response and the deadline race: whichever consumes the single-use
    /// resolution slot first wins and the loser is inert.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Timeout`] when the deadline passes with no
    /// allowed response.
    pub async fn await_response(
        &self,
        event_name: &str,
        correlation_id: &str,
        allowed_users: &[String],
        timeout: Duration,
    ) -> Result<Arc<Interaction>> {
        let (tx, rx) = oneshot::channel::<Arc<Interaction>>();

        // Single-use resolution slot. Taking the sender is the commit
        // point: only one responder (or the timeout path) ever gets it.
        let slot: Arc<Mutex<Option<oneshot::Sender<Arc<Interaction>>>>> =
            Arc::new(Mutex::new(Some(tx)));

        let allowed: HashSet<String> = allowed_users.iter().cloned().collect();
        let wanted = correlation_id.to_string();
        let platform = Arc::clone(&self.platform);
        let handler_slot = Arc::clone(&slot);

        let subscription = self.bus.subscribe(
            event_name,
            Arc::new(move |event: Arc<Interaction>| {
                let Some(embedded) = event.custom_id() else {
                    return Ok(());
                };
                if embedded != wanted {
                    // Somebody else's prompt; correlation is by id alone.
                    return Ok(());
                }

                if !allowed.is_empty() && !allowed.contains(&event.actor.user_id) {
                    debug!(correlation_id = %wanted, responder = %event.actor.user_id,
                        "Disallowed responder, prompt stays open");
                    let platform = Arc::clone(&platform);
                    let event = Arc::clone(&event);
                    tokio::spawn(async move {
                        if let Err(e) = platform.reply(&event, NOT_YOUR_PROMPT, true).await {
                            warn!(error = %e, "Failed to acknowledge disallowed responder");
                        }
                    });
                    return Ok(());
                }

                let sender = handler_slot.lock().expect("lock poisoned").take();
                if let Some(sender) = sender {
                    // Receiver may already be gone if the timeout fired in
                    // the same instant; the send result is irrelevant then.
                    let _ = sender.send(event);
                }
                Ok(())
            }),
        );

        let outcome = tokio::time::timeout(timeout, rx).await;

        // Consume the slot so a late response cannot change the outcome,
        // then drop the subscription. Both paths clean up exactly once.
        slot.lock().expect("lock poisoned").take();
        self.bus.unsubscribe(&subscription);

        match outcome {
            Ok(Ok(event)) => Ok(event),
            // Sender dropped without sending; treat like the deadline.
            Ok(Err(_)) => Err(WardenError::Timeout),
            Err(_) => {
                debug!(correlation_id = %correlation_id, "Prompt timed out");
                Err(WardenError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{Ack, RecordingClient};
    use crate::platform::{Actor, InteractionKind, EVENT_COMPONENT};

    fn response(custom_id: &str, user: &str, value: &str) -> Arc<Interaction> {
        Arc::new(Interaction {
            id: format!("int-{user}"),
            actor: Actor::bare(user),
            guild_id: Some("guild-1".into()),
            kind: InteractionKind::Component {
                custom_id: custom_id.into(),
                values: vec![value.into()],
            },
        })
    }

    struct Fixture {
        bus: Arc<EventBus>,
        platform: Arc<RecordingClient>,
        correlator: Arc<PromptCorrelator>,
    }

    fn fixture() -> Fixture {
        let bus = Arc::new(EventBus::new());
        let platform = Arc::new(RecordingClient::new());
        let correlator = Arc::new(PromptCorrelator::new(
            Arc::clone(&bus),
            Arc::clone(&platform) as Arc<dyn PlatformClient>,
        ));
        Fixture {
            bus,
            platform,
            correlator,
        }
    }

    #[tokio::test]
    async fn resolves_with_matching_response() {
        let f = fixture();
        let cid = new_correlation_id();

        let correlator = Arc::clone(&f.correlator);
        let wait_cid = cid.clone();
        let wait = tokio::spawn(async move {
            correlator
                .await_response(EVENT_COMPONENT, &wait_cid, &[], Duration::from_secs(5))
                .await
        });

        // Let the waiter register its subscription first.
        while f.bus.subscriber_count(EVENT_COMPONENT) == 0 {
            tokio::task::yield_now().await;
        }

        f.bus
            .publish(EVENT_COMPONENT, response(&cid, "user-a", "confirm"));

        let resolved = wait.await.unwrap().unwrap();
        assert_eq!(resolved.first_value(), Some("confirm"));
        // Subscription cleaned up.
        assert_eq!(f.bus.subscriber_count(EVENT_COMPONENT), 0);
    }

    #[tokio::test]
    async fn ignores_other_correlation_ids() {
        let f = fixture();

        let correlator = Arc::clone(&f.correlator);
        let wait = tokio::spawn(async move {
            correlator
                .await_response(EVENT_COMPONENT, "prompt-a", &[], Duration::from_millis(100))
                .await
        });
        while f.bus.subscriber_count(EVENT_COMPONENT) == 0 {
            tokio::task::yield_now().await;
        }

        f.bus
            .publish(EVENT_COMPONENT, response("prompt-b", "user-a", "confirm"));

        // Wrong id never resolves; the wait times out.
        let result = wait.await.unwrap();
        assert!(matches!(result, Err(WardenError::Timeout)));
    }

    #[tokio::test]
    async fn disallowed_responder_is_acknowledged_and_ignored() {
        let f = fixture();
        let cid = new_correlation_id();
        let allowed = vec!["user-a".to_string()];

        let correlator = Arc::clone(&f.correlator);
        let wait_cid = cid.clone();
        let wait = tokio::spawn(async move {
            correlator
                .await_response(EVENT_COMPONENT, &wait_cid, &allowed, Duration::from_secs(5))
                .await
        });
        while f.bus.subscriber_count(EVENT_COMPONENT) == 0 {
            tokio::task::yield_now().await;
        }

        // Response from user B does not resolve the wait.
        f.bus
            .publish(EVENT_COMPONENT, response(&cid, "user-b", "confirm"));
        tokio::task::yield_now().await;
        assert!(!wait.is_finished());

        // A subsequent response from A still resolves it.
        f.bus
            .publish(EVENT_COMPONENT, response(&cid, "user-a", "confirm"));
        let resolved = wait.await.unwrap().unwrap();
        assert_eq!(resolved.actor.user_id, "user-a");

        // B got a rejection acknowledgment (sent from a spawned task).
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            let rejected = f.platform.acks().iter().any(|a| matches!(
                a,
                Ack::Reply { interaction_id, ephemeral: true, .. } if interaction_id == "int-user-b"
            ));
            if rejected {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "no rejection ack sent");
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn times_out_and_late_response_is_inert() {
        let f = fixture();
        let cid = new_correlation_id();

        let result = f
            .correlator
            .await_response(EVENT_COMPONENT, &cid, &[], Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(WardenError::Timeout)));
        assert_eq!(f.bus.subscriber_count(EVENT_COMPONENT), 0);

        // A response arriving after the deadline reaches nobody.
        let delivered = f
            .bus
            .publish(EVENT_COMPONENT, response(&cid, "user-a", "confirm"));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn first_allowed_responder_wins() {
        let f = fixture();
        let cid = new_correlation_id();
        let allowed = vec!["user-a".to_string(), "user-b".to_string()];

        let correlator = Arc::clone(&f.correlator);
        let wait_cid = cid.clone();
        let wait = tokio::spawn(async move {
            correlator
                .await_response(EVENT_COMPONENT, &wait_cid, &allowed, Duration::from_secs(5))
                .await
        });
        while f.bus.subscriber_count(EVENT_COMPONENT) == 0 {
            tokio::task::yield_now().await;
        }

        // Two allowed users respond back to back; only the first is
        // delivered, the second finds the slot consumed.
        f.bus
            .publish(EVENT_COMPONENT, response(&cid, "user-a", "yes"));
        f.bus
            .publish(EVENT_COMPONENT, response(&cid, "user-b", "no"));

        let resolved = wait.await.unwrap().unwrap();
        assert_eq!(resolved.actor.user_id, "user-a");
    }

    #[tokio::test]
    async fn modal_submissions_correlate_too() {
        use crate::platform::EVENT_MODAL;

        let f = fixture();
        let cid = new_correlation_id();

        let correlator = Arc::clone(&f.correlator);
        let wait_cid = cid.clone();
        let wait = tokio::spawn(async move {
            correlator
                .await_response(EVENT_MODAL, &wait_cid, &[], Duration::from_secs(5))
                .await
        });
        while f.bus.subscriber_count(EVENT_MODAL) == 0 {
            tokio::task::yield_now().await;
        }

        let mut fields = std::collections::HashMap::new();
        fields.insert("note".to_string(), "weekly event".to_string());
        f.bus.publish(
            EVENT_MODAL,
            Arc::new(Interaction {
                id: "int-modal".into(),
                actor: Actor::bare("user-a"),
                guild_id: Some("guild-1".into()),
                kind: InteractionKind::ModalSubmit {
                    custom_id: cid.clone(),
                    fields,
                },
            }),
        );

        let resolved = wait.await.unwrap().unwrap();
        assert_eq!(resolved.custom_id(), Some(cid.as_str()));
    }

    #[tokio::test]
    async fn concurrent_prompts_do_not_cross_resolve() {
        let f = fixture();
        let cid_one = new_correlation_id();
        let cid_two = new_correlation_id();

        let c1 = Arc::clone(&f.correlator);
        let id1 = cid_one.clone();
        let wait_one = tokio::spawn(async move {
            c1.await_response(EVENT_COMPONENT, &id1, &[], Duration::from_secs(5))
                .await
        });
        let c2 = Arc::clone(&f.correlator);
        let id2 = cid_two.clone();
        let wait_two = tokio::spawn(async move {
            c2.await_response(EVENT_COMPONENT, &id2, &[], Duration::from_secs(5))
                .await
        });
        while f.bus.subscriber_count(EVENT_COMPONENT) < 2 {
            tokio::task::yield_now().await;
        }

        f.bus
            .publish(EVENT_COMPONENT, response(&cid_two, "user-b", "two"));
        f.bus
            .publish(EVENT_COMPONENT, response(&cid_one, "user-a", "one"));

        assert_eq!(wait_one.await.unwrap().unwrap().first_value(), Some("one"));
        assert_eq!(wait_two.await.unwrap().unwrap().first_value(), Some("two"));
    }
}
