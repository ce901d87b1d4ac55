//! Event envelopes and handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use keystone_core::KeystoneResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// A published event as seen by handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique per publish call.
    pub id: Uuid,
    /// Topic the event was published on.
    pub topic: String,
    /// Publish time (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Event body.
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Wraps a payload for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            topic: topic.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Decodes the payload into `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> KeystoneResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Receives events for the topics it is registered on.
///
/// Each invocation runs in its own task. A panic or an `Err` affects only
/// that invocation and is reported back to the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: Arc<Envelope>) -> KeystoneResult<()>;
}

type HandlerFn = dyn Fn(Arc<Envelope>) -> BoxFuture<'static, KeystoneResult<()>> + Send + Sync;

/// Handler backed by an async closure.
pub struct FnHandler {
    f: Box<HandlerFn>,
}

impl FnHandler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Envelope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KeystoneResult<()>> + Send + 'static,
    {
        Self {
            f: Box::new(move |envelope| Box::pin(f(envelope))),
        }
    }
}

#[async_trait]
impl EventHandler for FnHandler {
    async fn handle(&self, envelope: Arc<Envelope>) -> KeystoneResult<()> {
        (self.f)(envelope).await
    }
}

/// Shorthand for `Arc::new(FnHandler::new(f))`.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Arc<Envelope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KeystoneResult<()>> + Send + 'static,
{
    Arc::new(FnHandler::new(f))
}
