use std::sync::Arc;

use crate::domain::EmailAddress;
use crate::error::Result;
use crate::model::NewSubscriber;
use crate::repo::SubscriberRepo;
use crate::telemetry::spawn_with_tracing;

use super::dispatch::Dispatcher;

/// Stores and removes subscriber addresses
pub struct Registry {
    subscribers: Arc<dyn SubscriberRepo>,
    /// Sends the welcome email to new subscribers when set
    welcome: Option<Arc<Dispatcher>>,
}

impl Registry {
    pub fn new(subscribers: Arc<dyn SubscriberRepo>, welcome: Option<Arc<Dispatcher>>) -> Self {
        Self {
            subscribers,
            welcome,
        }
    }

    /// Store a subscriber, succeeding for new and already known addresses alike
    #[tracing::instrument(name = "Subscribe", skip(self))]
    pub async fn subscribe(&self, email: &str) -> Result<EmailAddress> {
        let email: EmailAddress = email.parse()?;

        let created = self
            .subscribers
            .insert_if_absent(&NewSubscriber::free(email.clone()))
            .await?;

        if created {
            tracing::info!(subscriber = %email, "New subscriber");
            if let Some(dispatcher) = &self.welcome {
                let dispatcher = dispatcher.clone();
                let recipient = email.clone();
                spawn_with_tracing(async move {
                    let report = dispatcher.welcome(&recipient).await;
                    if !report.failures.is_empty() {
                        tracing::warn!(failures = ?report.failures, "Welcome email not delivered");
                    }
                });
            }
        }

        Ok(email)
    }

    /// Best-effort removal. Store errors are logged and never reported.
    #[tracing::instrument(name = "Unsubscribe", skip(self))]
    pub async fn unsubscribe(&self, email: &str) {
        let email = EmailAddress::normalize(email);
        if email.is_empty() {
            return;
        }

        match self.subscribers.delete_by_email(&email).await {
            Ok(removed) => tracing::info!(removed, "Unsubscribed"),
            Err(e) => tracing::error!(error.cause_chain = ?e, "Failed to remove subscriber"),
        }
    }
}
