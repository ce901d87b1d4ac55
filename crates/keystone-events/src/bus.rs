//! Topic registry and publish/dispatch.

use crate::metrics::EventMetrics;
use crate::{Envelope, EventHandler, HandlerOutcome, HandlerStatus, PublishReport};
use async_trait::async_trait;
use keystone_config::EventsConfig;
use keystone_core::{DomainEvent, Interface, KeystoneError, KeystoneResult};
use parking_lot::RwLock;
use shaku::Component;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Publish/subscribe contract used by event producers.
#[async_trait]
pub trait MessageBus: Interface + Send + Sync {
    /// Registers `handler` under `(topic, name)`.
    ///
    /// Registering a name that is already present keeps the existing handler
    /// and returns `false`.
    fn add_listener(&self, topic: &str, name: &str, handler: Arc<dyn EventHandler>) -> bool;

    /// Unregisters `(topic, name)`. Fails with `HandlerNotRegistered` if absent.
    fn remove_listener(&self, topic: &str, name: &str) -> KeystoneResult<()>;

    /// Runs every handler of `topic` concurrently and waits for all of them,
    /// or until the bus's publish timeout if one is configured.
    ///
    /// Fails with `TopicHasNoHandlers` when nothing is registered.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> KeystoneResult<PublishReport>;

    /// Like [`publish`](Self::publish) with an explicit deadline. `None` waits indefinitely.
    async fn publish_with_timeout(
        &self,
        topic: &str,
        payload: serde_json::Value,
        timeout: Option<Duration>,
    ) -> KeystoneResult<PublishReport>;

    /// Topics that currently have at least one handler.
    fn topics(&self) -> Vec<String>;

    /// Handler names registered on `topic`, sorted.
    fn listener_names(&self, topic: &str) -> Vec<String>;

    fn has_listener(&self, topic: &str, name: &str) -> bool;
}

/// Typed helpers over [`MessageBus`].
#[async_trait]
pub trait MessageBusExt: MessageBus {
    /// Publishes a domain event on its own `event_type` topic.
    async fn publish_event<E: DomainEvent + ?Sized>(&self, event: &E) -> KeystoneResult<PublishReport> {
        let payload = event.to_payload()?;
        self.publish(event.event_type(), payload).await
    }
}

impl<T: MessageBus + ?Sized> MessageBusExt for T {}

/// `topic -> (handler name -> handler)`.
#[derive(Default)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<String, BTreeMap<String, Arc<dyn EventHandler>>>>,
}

impl TopicRegistry {
    fn snapshot(&self, topic: &str) -> Vec<(String, Arc<dyn EventHandler>)> {
        self.topics
            .read()
            .get(topic)
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|(name, handler)| (name.clone(), Arc::clone(handler)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// In-process event bus.
#[derive(Component)]
#[shaku(interface = MessageBus)]
pub struct EventBus {
    registry: TopicRegistry,
    #[shaku(default = None)]
    publish_timeout: Option<Duration>,
}

impl EventBus {
    /// Creates a bus that waits for every handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: TopicRegistry::default(),
            publish_timeout: None,
        }
    }

    /// Creates a bus that aborts handlers still running after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            registry: TopicRegistry::default(),
            publish_timeout: Some(timeout),
        }
    }

    #[must_use]
    pub fn from_config(config: &EventsConfig) -> Self {
        Self {
            registry: TopicRegistry::default(),
            publish_timeout: config.publish_timeout(),
        }
    }

    /// Returns the default publish timeout.
    #[must_use]
    pub const fn publish_timeout(&self) -> Option<Duration> {
        self.publish_timeout
    }

    async fn dispatch(
        &self,
        topic: &str,
        payload: serde_json::Value,
        timeout: Option<Duration>,
    ) -> KeystoneResult<PublishReport> {
        let handlers = self.registry.snapshot(topic);
        if handlers.is_empty() {
            return Err(KeystoneError::TopicHasNoHandlers(topic.to_string()));
        }

        let envelope = Arc::new(Envelope::new(topic, payload));
        let started = Instant::now();
        debug!(
            topic = %topic,
            event_id = %envelope.id,
            handlers = handlers.len(),
            "Dispatching event"
        );

        let tasks: Vec<(String, JoinHandle<KeystoneResult<()>>)> = handlers
            .into_iter()
            .map(|(name, handler)| {
                let envelope = Arc::clone(&envelope);
                (name, tokio::spawn(async move { handler.handle(envelope).await }))
            })
            .collect();

        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (name, mut task) in tasks {
            let status = match deadline {
                None => status_of(task.await),
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut task).await {
                    Ok(joined) => status_of(joined),
                    Err(_) => {
                        task.abort();
                        HandlerStatus::TimedOut
                    }
                },
            };

            EventMetrics::handler_outcome(topic, &name, status.as_str());
            if !status.is_completed() {
                warn!(topic = %topic, handler = %name, status = %status, "Event handler did not complete");
            }
            outcomes.push(HandlerOutcome { handler: name, status });
        }

        let elapsed = started.elapsed();
        EventMetrics::published(topic, outcomes.len(), elapsed);

        Ok(PublishReport {
            topic: topic.to_string(),
            event_id: envelope.id,
            outcomes,
            elapsed,
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn status_of(joined: Result<KeystoneResult<()>, tokio::task::JoinError>) -> HandlerStatus {
    match joined {
        Ok(Ok(())) => HandlerStatus::Completed,
        Ok(Err(e)) => HandlerStatus::Failed(e.to_string()),
        Err(e) if e.is_panic() => HandlerStatus::Panicked(panic_message(e.into_panic())),
        Err(e) => HandlerStatus::Failed(e.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[async_trait]
impl MessageBus for EventBus {
    fn add_listener(&self, topic: &str, name: &str, handler: Arc<dyn EventHandler>) -> bool {
        let mut topics = self.registry.topics.write();
        let handlers = topics.entry(topic.to_string()).or_default();

        if handlers.contains_key(name) {
            debug!(topic = %topic, handler = %name, "Listener already registered");
            return false;
        }

        handlers.insert(name.to_string(), handler);
        info!(topic = %topic, handler = %name, "Listener registered");
        true
    }

    fn remove_listener(&self, topic: &str, name: &str) -> KeystoneResult<()> {
        let mut topics = self.registry.topics.write();

        let removed = topics
            .get_mut(topic)
            .and_then(|handlers| handlers.remove(name))
            .is_some();
        if !removed {
            return Err(KeystoneError::HandlerNotRegistered {
                topic: topic.to_string(),
                handler: name.to_string(),
            });
        }

        if topics.get(topic).is_some_and(BTreeMap::is_empty) {
            topics.remove(topic);
        }
        info!(topic = %topic, handler = %name, "Listener removed");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: serde_json::Value) -> KeystoneResult<PublishReport> {
        self.dispatch(topic, payload, self.publish_timeout).await
    }

    async fn publish_with_timeout(
        &self,
        topic: &str,
        payload: serde_json::Value,
        timeout: Option<Duration>,
    ) -> KeystoneResult<PublishReport> {
        self.dispatch(topic, payload, timeout).await
    }

    fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.registry.topics.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    fn listener_names(&self, topic: &str) -> Vec<String> {
        self.registry
            .topics
            .read()
            .get(topic)
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_listener(&self, topic: &str, name: &str) -> bool {
        self.registry
            .topics
            .read()
            .get(topic)
            .is_some_and(|handlers| handlers.contains_key(name))
    }
}
