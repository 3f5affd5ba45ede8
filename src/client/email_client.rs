use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use super::mail::{Email, MailSender, Sender};

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Mail transport backed by a Postmark-style REST API
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: Sender,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: Sender,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_send_email_url = api_base_url
            .join("email")
            .context("Failed to create send email endpoint URL")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }
}

#[async_trait::async_trait]
impl MailSender for EmailClient {
    fn sender(&self) -> &Sender {
        &self.sender
    }

    #[tracing::instrument(name = "Send an email via API", skip(self, email), fields(recipient = %email.recipient))]
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        use secrecy::ExposeSecret;

        let from = self.sender.to_string();
        let body = SendEmailRequest {
            to: email.recipient.as_ref(),
            from: &from,
            subject: &email.subject,
            html_body: &email.html_body,
            text_body: &email.text_body,
        };

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
