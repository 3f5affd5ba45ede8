use std::sync::Arc;

use chrono::Utc;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::error::{Error, Result};
use crate::repo::{DealRepo, SubscriberRepo};

use super::compose::Composer;
use super::outbox::{DeliveryReport, Outbox};

/// What a notification run is about
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyTarget {
    Deal(String),
    Welcome,
}

impl NotifyTarget {
    /// Resolve the target of a notify request. Welcome wins when both are given.
    pub fn from_request(deal_id: Option<String>, welcome: bool) -> Result<Self> {
        if welcome {
            return Ok(Self::Welcome);
        }

        match deal_id {
            Some(id) if !id.trim().is_empty() => Ok(Self::Deal(id)),
            _ => Err(Error::ParsingError(
                "Provide dealId or set welcome: true".into(),
            )),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// The deal was notified within the cooldown window
    RateLimited,
    NoRecipients,
    DryRun {
        from: String,
        subject: String,
        would_send_to: usize,
    },
    Delivered(DeliveryReport),
}

/// Fans a deal alert or welcome email out to every subscriber
pub struct Dispatcher {
    deals: Arc<dyn DealRepo>,
    subscribers: Arc<dyn SubscriberRepo>,
    outbox: Outbox,
    composer: Arc<Composer>,
    cooldown: chrono::Duration,
}

impl Dispatcher {
    pub fn new(
        deals: Arc<dyn DealRepo>,
        subscribers: Arc<dyn SubscriberRepo>,
        outbox: Outbox,
        composer: Arc<Composer>,
        cooldown: chrono::Duration,
    ) -> Self {
        Self {
            deals,
            subscribers,
            outbox,
            composer,
            cooldown,
        }
    }

    #[tracing::instrument(name = "Dispatch notification", skip(self))]
    pub async fn notify(&self, target: NotifyTarget, dry_run: bool) -> Result<DispatchOutcome> {
        let deal = match &target {
            NotifyTarget::Welcome => None,
            NotifyTarget::Deal(id) => {
                let deal = match Uuid::parse_str(id.trim()) {
                    Ok(id) => self.deals.fetch_by_id(id).await?,
                    Err(_) => None,
                }
                .ok_or(Error::NotFound("Deal"))?;

                if deal.is_cooling_down(Utc::now(), self.cooldown) {
                    tracing::info!(deal_id = %deal.id, "Deal notified within cooldown window");
                    return Ok(DispatchOutcome::RateLimited);
                }
                Some(deal)
            }
        };

        let recipients = load_recipients(self.subscribers.as_ref()).await?;
        if recipients.is_empty() {
            return Ok(DispatchOutcome::NoRecipients);
        }

        if dry_run {
            let subject = match &deal {
                Some(deal) => self.composer.deal_alert_subject(deal),
                None => self.composer.welcome_subject(),
            };
            return Ok(DispatchOutcome::DryRun {
                from: self.outbox.from(),
                subject,
                would_send_to: recipients.len(),
            });
        }

        let emails = recipients
            .iter()
            .map(|recipient| match &deal {
                Some(deal) => self.composer.deal_alert(deal, recipient),
                None => self.composer.welcome(recipient),
            })
            .collect();
        let report = self.outbox.deliver(emails).await;

        if let Some(deal) = &deal {
            if report.sent > 0 {
                if let Err(e) = self.deals.mark_notified(deal.id, Utc::now()).await {
                    tracing::error!(error.cause_chain = ?e, deal_id = %deal.id, "Failed to stamp notification time");
                }
            }
        }

        Ok(DispatchOutcome::Delivered(report))
    }

    /// Send the welcome email to a single new subscriber
    #[tracing::instrument(name = "Send welcome email", skip(self))]
    pub async fn welcome(&self, recipient: &EmailAddress) -> DeliveryReport {
        let email = self.composer.welcome(recipient);
        self.outbox.deliver(vec![email]).await
    }
}

/// All stored subscriber addresses that can be mailed
pub(crate) async fn load_recipients(subscribers: &dyn SubscriberRepo) -> Result<Vec<EmailAddress>> {
    let recipients = subscribers
        .fetch_all_emails()
        .await?
        .into_iter()
        .filter(|email| email.contains('@'))
        .filter_map(|email| match email.parse::<EmailAddress>() {
            Ok(recipient) => Some(recipient),
            Err(error) => {
                tracing::warn!(%error, "Skipping a stored subscriber (email: {})", email);
                None
            }
        })
        .collect();

    Ok(recipients)
}
