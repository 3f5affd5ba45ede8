use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use serde::Serialize;

use crate::client::{Email, MailSender};

/// Recipient whose message could not be delivered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendFailure {
    pub to: String,
    pub error: String,
}

/// Outcome of a batch of sends
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failures: Vec<SendFailure>,
}

/// Delivers batches of emails with bounded concurrency.
/// Every send is independent: a failure or timeout is recorded and the batch carries on.
#[derive(Clone)]
pub struct Outbox {
    mailer: Arc<dyn MailSender>,
    max_connections: usize,
    send_timeout: Duration,
}

impl Outbox {
    pub fn new(mailer: Arc<dyn MailSender>, max_connections: usize, send_timeout: Duration) -> Self {
        Self {
            mailer,
            max_connections: max_connections.max(1),
            send_timeout,
        }
    }

    /// The `From` header shown to recipients
    pub fn from(&self) -> String {
        self.mailer.sender().to_string()
    }

    #[tracing::instrument(name = "Deliver emails", skip(self, emails), fields(count = emails.len()))]
    pub async fn deliver(&self, emails: Vec<Email>) -> DeliveryReport {
        let results: Vec<(String, Result<(), String>)> = stream::iter(emails)
            .map(|email| async move {
                let to = email.recipient.to_string();
                let result = match tokio::time::timeout(self.send_timeout, self.mailer.send(&email)).await
                {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!(
                        "send timed out after {}ms",
                        self.send_timeout.as_millis()
                    )),
                };
                (to, result)
            })
            .buffer_unordered(self.max_connections)
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for (to, result) in results {
            match result {
                Ok(()) => report.sent += 1,
                Err(error) => {
                    tracing::warn!(recipient = %to, %error, "Failed to send email");
                    report.failures.push(SendFailure { to, error });
                }
            }
        }
        report
    }
}
