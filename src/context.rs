//! Bot context — explicit construction and teardown
//!
//! Owns the bus, the store, the correlator, and the dispatcher, and wires
//! the inbound event names to the dispatch pipeline. Lifecycle:
//!
//! 1. [`WardenContext::connect`] — open the store (dev mode falls back to
//!    the in-memory driver when the database is unreachable).
//! 2. `register_command` / `register_component` — populate the registry.
//! 3. [`WardenContext::start`] — subscribe the dispatcher to the inbound
//!    event names; the registry becomes read-only.
//! 4. [`WardenContext::shutdown`] — unsubscribe, drain in-flight
//!    interactions, close the store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::config::Args;
use crate::db::{MemoryDriver, MongoDriver, ProfileDriver};
use crate::dispatch::{CommandHandler, ComponentHandler, Dispatcher, HandlerContext};
use crate::platform::{
    PlatformClient, EVENT_COMMAND, EVENT_COMPONENT, EVENT_MODAL, EVENT_SELECT,
};
use crate::prompt::PromptCorrelator;
use crate::store::ProfileStore;
use crate::types::{Result, WardenError};

/// Counts in-flight interaction tasks so shutdown can drain them.
struct TaskGauge {
    active: AtomicUsize,
}

impl TaskGauge {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
        })
    }

    fn spawn(self: &Arc<Self>, fut: impl std::future::Future<Output = ()> + Send + 'static) {
        self.active.fetch_add(1, Ordering::SeqCst);
        let gauge = Arc::clone(self);
        tokio::spawn(async move {
            fut.await;
            gauge.active.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Wait until no task is in flight, up to `timeout`. Returns whether
    /// the gauge reached zero.
    async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.active.load(Ordering::SeqCst) == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Explicitly constructed bot context.
pub struct WardenContext {
    bus: Arc<EventBus>,
    store: ProfileStore,
    driver: Arc<dyn ProfileDriver>,
    /// Present during the registration window, before `start`.
    registering: Option<Box<Dispatcher>>,
    /// Present in steady state; the registry is read-only from here on.
    running: Option<Arc<Dispatcher>>,
    subscriptions: Vec<SubscriptionId>,
    tasks: Arc<TaskGauge>,
    drain_timeout: Duration,
}

impl WardenContext {
    /// Connect the store and assemble the context around a platform
    /// client. In dev mode an unreachable database falls back to the
    /// in-memory driver.
    pub async fn connect(args: &Args, platform: Arc<dyn PlatformClient>) -> Result<Self> {
        let driver: Arc<dyn ProfileDriver> =
            match MongoDriver::connect(&args.mongodb_uri, &args.mongodb_db).await {
                Ok(driver) => Arc::new(driver),
                Err(e) if args.dev_mode => {
                    warn!("MongoDB connection failed (dev mode, continuing in memory): {e}");
                    Arc::new(MemoryDriver::new())
                }
                Err(e) => return Err(e),
            };

        Ok(Self::assemble(
            driver,
            platform,
            args.developer_set(),
            args.drain_timeout(),
        ))
    }

    /// Assemble a context over an already-built driver. Used by tests and
    /// by embedders that manage their own connections.
    pub fn with_driver(
        driver: Arc<dyn ProfileDriver>,
        platform: Arc<dyn PlatformClient>,
        developers: std::collections::HashSet<String>,
    ) -> Self {
        Self::assemble(driver, platform, developers, Duration::from_secs(10))
    }

    fn assemble(
        driver: Arc<dyn ProfileDriver>,
        platform: Arc<dyn PlatformClient>,
        developers: std::collections::HashSet<String>,
        drain_timeout: Duration,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let store = ProfileStore::new(Arc::clone(&driver));
        let prompts = Arc::new(PromptCorrelator::new(
            Arc::clone(&bus),
            Arc::clone(&platform),
        ));

        let ctx = HandlerContext {
            platform,
            store: store.clone(),
            prompts,
            bus: Arc::clone(&bus),
        };

        Self {
            bus,
            store,
            driver,
            registering: Some(Box::new(Dispatcher::new(ctx, developers))),
            running: None,
            subscriptions: Vec::new(),
            tasks: TaskGauge::new(),
            drain_timeout,
        }
    }

    /// Register a command handler. Only valid before [`start`](Self::start).
    pub fn register_command(&mut self, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let dispatcher = self.registering.as_mut().ok_or_else(|| {
            WardenError::Config("registry is read-only after start".into())
        })?;
        dispatcher.register_command(handler);
        Ok(())
    }

    /// Register a static component handler. Only valid before
    /// [`start`](Self::start).
    pub fn register_component(&mut self, handler: Arc<dyn ComponentHandler>) -> Result<()> {
        let dispatcher = self.registering.as_mut().ok_or_else(|| {
            WardenError::Config("registry is read-only after start".into())
        })?;
        dispatcher.register_component(handler);
        Ok(())
    }

    /// Wire the dispatcher to the inbound event names and enter steady
    /// state. Each inbound interaction runs as its own task.
    pub fn start(&mut self) -> Result<()> {
        let dispatcher = Arc::new(*self.registering.take().ok_or_else(|| {
            WardenError::Config("context already started".into())
        })?);
        self.running = Some(Arc::clone(&dispatcher));

        for event_name in [EVENT_COMMAND, EVENT_COMPONENT, EVENT_MODAL, EVENT_SELECT] {
            let dispatcher = Arc::clone(&dispatcher);
            let tasks = Arc::clone(&self.tasks);
            let id = self.bus.subscribe(
                event_name,
                Arc::new(move |event| {
                    let dispatcher = Arc::clone(&dispatcher);
                    tasks.spawn(async move {
                        dispatcher.dispatch(event).await;
                    });
                    Ok(())
                }),
            );
            self.subscriptions.push(id);
        }

        info!("Dispatcher attached to inbound events");
        Ok(())
    }

    /// Whether `start` has run and the dispatcher is attached.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The bus the platform gateway publishes inbound interactions onto.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Detach from the bus, drain in-flight interactions, and close the
    /// store.
    pub async fn shutdown(self) -> Result<()> {
        for id in &self.subscriptions {
            self.bus.unsubscribe(id);
        }

        if !self.tasks.drain(self.drain_timeout).await {
            warn!("Shutdown drain timed out with interactions still in flight");
        }

        self.driver.shutdown().await?;
        info!("Context shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::HandlerContext;
    use crate::platform::testing::RecordingClient;
    use crate::platform::{Actor, Interaction, InteractionKind};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;

    struct CountingCommand {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler for CountingCommand {
        fn name(&self) -> &str {
            "count"
        }

        async fn execute(&self, _ctx: &HandlerContext, _interaction: &Interaction) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context() -> WardenContext {
        WardenContext::with_driver(
            Arc::new(MemoryDriver::new()),
            Arc::new(RecordingClient::new()),
            HashSet::new(),
        )
    }

    fn command_event(name: &str) -> Arc<Interaction> {
        Arc::new(Interaction {
            id: "i-1".into(),
            actor: Actor {
                user_id: "u1".into(),
                roles: vec![],
                native_permissions: Some(0),
            },
            guild_id: None,
            kind: InteractionKind::Command {
                name: name.into(),
                options: HashMap::new(),
            },
        })
    }

    #[tokio::test]
    async fn published_events_reach_registered_handlers() {
        let mut ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        ctx.register_command(Arc::new(CountingCommand {
            calls: Arc::clone(&calls),
        }))
        .unwrap();
        ctx.start().unwrap();

        ctx.bus().publish(EVENT_COMMAND, command_event("count"));

        // The interaction runs as its own task; drain before asserting.
        assert!(ctx.tasks.drain(Duration::from_secs(1)).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn registration_closes_at_start() {
        let mut ctx = context();
        assert!(!ctx.is_running());
        ctx.start().unwrap();
        assert!(ctx.is_running());

        let result = ctx.register_command(Arc::new(CountingCommand {
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        assert!(matches!(result, Err(WardenError::Config(_))));

        // Starting twice is rejected too.
        assert!(matches!(ctx.start(), Err(WardenError::Config(_))));
    }

    #[tokio::test]
    async fn shutdown_detaches_from_bus() {
        let mut ctx = context();
        ctx.start().unwrap();
        assert_eq!(ctx.bus().subscriber_count(EVENT_COMMAND), 1);

        let bus = Arc::clone(ctx.bus());
        ctx.shutdown().await.unwrap();
        assert_eq!(bus.subscriber_count(EVENT_COMMAND), 0);
    }
}
