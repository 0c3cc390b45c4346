//! Event bus — the shared channel between the gateway and everything else
//!
//! The platform gateway publishes every inbound interaction here; the
//! dispatcher and the prompt correlator consume by subscription. Delivery
//! contract:
//!
//! - Subscribers for one event name receive events in registration order.
//! - A failing subscriber is logged and skipped; the rest still receive
//!   the event.
//! - No ordering is guaranteed across different event names.
//! - `unsubscribe` removes exactly one subscription and is an idempotent
//!   no-op afterwards. It is safe to call from inside a handler running
//!   under `publish`: delivery iterates a snapshot of the subscriber list
//!   taken before any handler runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::platform::Interaction;
use crate::types::WardenError;

/// Subscriber callback. Errors are isolated per subscriber: an `Err` is
/// logged and delivery continues.
pub type EventHandler = Arc<dyn Fn(Arc<Interaction>) -> Result<(), WardenError> + Send + Sync>;

/// Handle identifying one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    event_name: String,
    seq: u64,
}

struct Subscriber {
    seq: u64,
    handler: EventHandler,
}

/// In-memory publish/subscribe channel keyed by event name.
pub struct EventBus {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_seq: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a handler for an event name. Handlers for one name fire in
    /// the order they were registered.
    pub fn subscribe(&self, event_name: &str, handler: EventHandler) -> SubscriptionId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        subscribers
            .entry(event_name.to_string())
            .or_default()
            .push(Subscriber { seq, handler });

        SubscriptionId {
            event_name: event_name.to_string(),
            seq,
        }
    }

    /// Remove one subscription. Repeat calls with the same handle are
    /// no-ops.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        if let Some(list) = subscribers.get_mut(&id.event_name) {
            list.retain(|s| s.seq != id.seq);
            if list.is_empty() {
                subscribers.remove(&id.event_name);
            }
        }
    }

    /// Deliver an event to all current subscribers for its name, in
    /// registration order. Returns the number of subscribers that accepted
    /// delivery without error.
    pub fn publish(&self, event_name: &str, event: Arc<Interaction>) -> usize {
        // Snapshot before delivery so handlers may subscribe/unsubscribe
        // without corrupting this iteration.
        let snapshot: Vec<(u64, EventHandler)> = {
            let subscribers = self.subscribers.read().expect("lock poisoned");
            match subscribers.get(event_name) {
                Some(list) => list
                    .iter()
                    .map(|s| (s.seq, Arc::clone(&s.handler)))
                    .collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            debug!(event = %event_name, "No subscribers for event");
            return 0;
        }

        let mut delivered = 0;
        for (seq, handler) in snapshot {
            match handler(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(event = %event_name, subscription = seq, error = %e,
                        "Subscriber failed, continuing delivery");
                }
            }
        }
        delivered
    }

    /// Number of subscriptions currently registered for an event name.
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        let subscribers = self.subscribers.read().expect("lock poisoned");
        subscribers.get(event_name).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Actor, InteractionKind};
    use std::sync::Mutex;

    fn component_event(custom_id: &str) -> Arc<Interaction> {
        Arc::new(Interaction {
            id: "int-1".into(),
            actor: Actor::bare("user-1"),
            guild_id: None,
            kind: InteractionKind::Component {
                custom_id: custom_id.into(),
                values: vec![],
            },
        })
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(
                "test.event",
                Arc::new(move |_| {
                    order.lock().unwrap().push(tag);
                    Ok(())
                }),
            );
        }

        let delivered = bus.publish("test.event", component_event("c-1"));
        assert_eq!(delivered, 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_subscriber_does_not_stop_delivery() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(false));

        bus.subscribe(
            "test.event",
            Arc::new(|_| Err(WardenError::Handler("boom".into()))),
        );
        let reached_clone = Arc::clone(&reached);
        bus.subscribe(
            "test.event",
            Arc::new(move |_| {
                *reached_clone.lock().unwrap() = true;
                Ok(())
            }),
        );

        let delivered = bus.publish("test.event", component_event("c-1"));
        assert_eq!(delivered, 1);
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let id = bus.subscribe("test.event", Arc::new(|_| Ok(())));
        assert_eq!(bus.subscriber_count("test.event"), 1);

        bus.unsubscribe(&id);
        assert_eq!(bus.subscriber_count("test.event"), 0);

        // Second call is a no-op.
        bus.unsubscribe(&id);
        assert_eq!(bus.subscriber_count("test.event"), 0);
    }

    #[test]
    fn unsubscribe_removes_exactly_one() {
        let bus = EventBus::new();
        let first = bus.subscribe("test.event", Arc::new(|_| Ok(())));
        let _second = bus.subscribe("test.event", Arc::new(|_| Ok(())));

        bus.unsubscribe(&first);
        assert_eq!(bus.subscriber_count("test.event"), 1);
    }

    #[test]
    fn reentrant_unsubscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        // The first handler unsubscribes itself mid-dispatch; the second
        // must still be delivered from the same publish.
        let self_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let bus_for_handler = Arc::clone(&bus);
        let self_id_for_handler = Arc::clone(&self_id);
        let order_first = Arc::clone(&order);
        let id = bus.subscribe(
            "test.event",
            Arc::new(move |_| {
                order_first.lock().unwrap().push("first");
                if let Some(id) = self_id_for_handler.lock().unwrap().as_ref() {
                    bus_for_handler.unsubscribe(id);
                }
                Ok(())
            }),
        );
        *self_id.lock().unwrap() = Some(id);

        let order_second = Arc::clone(&order);
        bus.subscribe(
            "test.event",
            Arc::new(move |_| {
                order_second.lock().unwrap().push("second");
                Ok(())
            }),
        );

        assert_eq!(bus.publish("test.event", component_event("c-1")), 2);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

        // Next publish no longer reaches the removed handler.
        assert_eq!(bus.publish("test.event", component_event("c-2")), 1);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["first", "second", "second"]
        );
    }

    #[test]
    fn names_are_isolated() {
        let bus = EventBus::new();
        let hit = Arc::new(Mutex::new(0));
        let hit_clone = Arc::clone(&hit);
        bus.subscribe(
            "a",
            Arc::new(move |_| {
                *hit_clone.lock().unwrap() += 1;
                Ok(())
            }),
        );

        assert_eq!(bus.publish("b", component_event("c-1")), 0);
        assert_eq!(*hit.lock().unwrap(), 0);
    }
}
