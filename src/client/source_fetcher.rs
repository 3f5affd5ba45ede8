use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use url::Url;

/// Retrieves the raw markup of a deal listing page
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpSourceFetcher {
    #[tracing::instrument(name = "Fetch source page", skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        let body = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}
