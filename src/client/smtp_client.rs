use std::time::Duration;

use anyhow::Context;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use super::mail::{Email, MailSender, Sender};

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS, usually port 465
    Wrapper,
    #[default]
    StartTls,
    /// Plaintext, for local relays only
    None,
}

#[derive(Debug, Clone)]
pub struct SmtpOptions {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    pub security: SmtpSecurity,
    pub timeout: Duration,
    pub max_connections: u32,
}

/// Mail transport backed by a pooled SMTP relay
pub struct SmtpClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Sender,
    from: Mailbox,
}

impl SmtpClient {
    pub fn new(sender: Sender, options: SmtpOptions) -> anyhow::Result<Self> {
        let from = Mailbox::new(
            sender.name.clone(),
            sender
                .address
                .as_ref()
                .parse()
                .context("Invalid sender address")?,
        );

        let builder = match options.security {
            SmtpSecurity::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&options.host)
                .context("Failed to configure SMTP relay")?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&options.host)
                    .context("Failed to configure SMTP relay")?
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&options.host)
            }
        };

        let mut builder = builder
            .port(options.port)
            .timeout(Some(options.timeout))
            .pool_config(PoolConfig::new().max_size(options.max_connections.max(1)));

        if let (Some(username), Some(password)) = (options.username, options.password) {
            builder = builder.credentials(Credentials::new(
                username,
                password.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
            from,
        })
    }
}

#[async_trait::async_trait]
impl MailSender for SmtpClient {
    fn sender(&self) -> &Sender {
        &self.sender
    }

    #[tracing::instrument(name = "Send an email via SMTP", skip(self, email), fields(recipient = %email.recipient))]
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        let to: Mailbox = email
            .recipient
            .as_ref()
            .parse()
            .context("Invalid recipient address")?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .context("Failed to build message")?;

        self.transport.send(message).await?;
        Ok(())
    }
}
