use std::fmt;

use crate::domain::EmailAddress;

/// Outbound mail transport
#[async_trait::async_trait]
pub trait MailSender: Send + Sync {
    /// The `From` header used for every message
    fn sender(&self) -> &Sender;

    /// Deliver a single message
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Display name and address that application emails are sent from
#[derive(Debug, Clone, PartialEq)]
pub struct Sender {
    pub name: Option<String>,
    pub address: EmailAddress,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => self.address.fmt(f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Email {
    pub recipient: EmailAddress,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}
