//! Confirmation-code issuance.
//!
//! Publishing an inactive confirmation is a programming error. The handler
//! aborts the process when it sees one.

use crate::{Envelope, EventHandler, MessageBus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystone_core::{DomainEvent, KeystoneResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Topic carrying [`ConfirmationIssued`] events.
pub const CONFIRMATION_ISSUED: &str = "confirmation.issued";

/// Name of the handler that delivers confirmation codes.
pub const SEND_CONFIRMATION: &str = "send_confirmation";

/// A confirmation code was issued to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationIssued {
    pub confirmation_id: Uuid,
    /// Email address or phone number.
    pub recipient: String,
    pub code: String,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

impl ConfirmationIssued {
    /// Creates an active confirmation valid for `ttl`.
    #[must_use]
    pub fn new(recipient: impl Into<String>, code: impl Into<String>, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            confirmation_id: Uuid::new_v4(),
            recipient: recipient.into(),
            code: code.into(),
            active: true,
            expires_at,
            issued_at,
        }
    }

    /// Marks the confirmation inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

impl DomainEvent for ConfirmationIssued {
    fn event_type(&self) -> &'static str {
        CONFIRMATION_ISSUED
    }

    fn aggregate_id(&self) -> String {
        self.confirmation_id.to_string()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.issued_at
    }

    fn to_payload(&self) -> KeystoneResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Delivers confirmation codes to recipients.
#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    async fn deliver(&self, confirmation: &ConfirmationIssued) -> KeystoneResult<()>;
}

/// Notifier that only logs the delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConfirmationNotifier;

#[async_trait]
impl ConfirmationNotifier for LogConfirmationNotifier {
    async fn deliver(&self, confirmation: &ConfirmationIssued) -> KeystoneResult<()> {
        info!(
            confirmation_id = %confirmation.confirmation_id,
            recipient = %confirmation.recipient,
            expires_at = %confirmation.expires_at,
            "Confirmation code sent"
        );
        Ok(())
    }
}

/// Sends the code carried by a [`ConfirmationIssued`] event.
pub struct SendConfirmationHandler {
    notifier: Arc<dyn ConfirmationNotifier>,
}

impl SendConfirmationHandler {
    #[must_use]
    pub fn new(notifier: Arc<dyn ConfirmationNotifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventHandler for SendConfirmationHandler {
    async fn handle(&self, envelope: Arc<Envelope>) -> KeystoneResult<()> {
        let confirmation: ConfirmationIssued = envelope.decode()?;

        if !confirmation.active {
            error!(
                confirmation_id = %confirmation.confirmation_id,
                "Inactive confirmation published, aborting"
            );
            std::process::abort();
        }

        self.notifier.deliver(&confirmation).await
    }
}

/// Registers the confirmation handlers on `bus`.
///
/// Returns `false` if they were already registered.
pub fn register_confirmation_listeners(bus: &dyn MessageBus, notifier: Arc<dyn ConfirmationNotifier>) -> bool {
    bus.add_listener(
        CONFIRMATION_ISSUED,
        SEND_CONFIRMATION,
        Arc::new(SendConfirmationHandler::new(notifier)),
    )
}
