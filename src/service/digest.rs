use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::repo::{DealRepo, SubscriberRepo};

use super::compose::Composer;
use super::dispatch::load_recipients;
use super::outbox::{DeliveryReport, Outbox};

#[derive(Debug, Clone)]
pub struct DigestOptions {
    pub disabled: bool,
    /// How far back deals are considered
    pub window: chrono::Duration,
    pub max_deals: i64,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            disabled: false,
            window: chrono::Duration::days(7),
            max_deals: 10,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DigestOutcome {
    Disabled,
    NoDeals,
    NoRecipients,
    Delivered(DeliveryReport),
}

/// Weekly roundup of the cheapest recent deals, triggered by an external scheduler
pub struct DigestHook {
    deals: Arc<dyn DealRepo>,
    subscribers: Arc<dyn SubscriberRepo>,
    outbox: Outbox,
    composer: Arc<Composer>,
    options: DigestOptions,
}

impl DigestHook {
    pub fn new(
        deals: Arc<dyn DealRepo>,
        subscribers: Arc<dyn SubscriberRepo>,
        outbox: Outbox,
        composer: Arc<Composer>,
        options: DigestOptions,
    ) -> Self {
        Self {
            deals,
            subscribers,
            outbox,
            composer,
            options,
        }
    }

    #[tracing::instrument(name = "Run weekly digest", skip(self))]
    pub async fn run(&self) -> Result<DigestOutcome> {
        if self.options.disabled {
            return Ok(DigestOutcome::Disabled);
        }

        let since = Utc::now() - self.options.window;
        let deals = self
            .deals
            .fetch_cheapest_since(since, self.options.max_deals)
            .await?;
        if deals.is_empty() {
            return Ok(DigestOutcome::NoDeals);
        }

        let recipients = load_recipients(self.subscribers.as_ref()).await?;
        if recipients.is_empty() {
            return Ok(DigestOutcome::NoRecipients);
        }

        let emails = recipients
            .iter()
            .map(|recipient| self.composer.digest(&deals, recipient))
            .collect();

        Ok(DigestOutcome::Delivered(self.outbox.deliver(emails).await))
    }
}
