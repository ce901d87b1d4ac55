//! # Keystone Events
//!
//! Synchronous in-process event bus.
//!
//! Handlers are registered under `(topic, name)`; registering the same pair
//! twice keeps the first handler. [`MessageBus::publish`] runs every handler
//! of a topic concurrently and returns once all of them have finished,
//! with a [`PublishReport`] describing how each one ended.

mod bus;
pub mod confirmation;
mod handler;
pub mod metrics;
mod report;

pub use bus::{EventBus, EventBusParameters, MessageBus, MessageBusExt, TopicRegistry};
pub use confirmation::{
    register_confirmation_listeners, ConfirmationIssued, ConfirmationNotifier, LogConfirmationNotifier,
    SendConfirmationHandler, CONFIRMATION_ISSUED, SEND_CONFIRMATION,
};
pub use handler::{handler_fn, Envelope, EventHandler, FnHandler};
pub use report::{HandlerOutcome, HandlerStatus, PublishReport};
