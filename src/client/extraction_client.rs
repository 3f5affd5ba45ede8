use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use secrecy::{ExposeSecret, Secret};

use serde::{Deserialize, Serialize};

use url::Url;

const EXTRACTION_PROMPT: &str = "\
The user message contains HTML excerpts from public flight deal listings for UK departures, \
each preceded by its SOURCE_URL.
Reply with a single JSON object holding an array under the key \"deals\". Each item has:
- origin_airport: IATA code, 3 letters
- destination_airport: IATA code, 3 letters
- price_gbp: integer price in pounds
- airline: optional
- trip_type: \"return\" or \"one-way\", default \"return\"
- outbound_dates: short human text such as \"Nov 10–20\" or \"Jan–Feb\"
- link: direct link to the deal page
Only include deals departing from UK airports. IATA codes are uppercase. \
Output compact JSON without comments.";

/// Turns listing page content into raw deal candidates
#[async_trait::async_trait]
pub trait DealExtractor: Send + Sync {
    /// Returns the items of the `deals` array, unvalidated.
    /// Output that is not a JSON object with a `deals` array yields no candidates.
    async fn extract(&self, content: &str) -> anyhow::Result<Vec<serde_json::Value>>;
}

/// Client for an OpenAI-compatible chat completions API in JSON mode
#[derive(Debug)]
pub struct ExtractionClient {
    client: Client,
    completions_url: Url,
    api_key: Secret<String>,
    model: String,
}

impl ExtractionClient {
    pub fn new(
        api_base_url: Url,
        api_key: Secret<String>,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;

        let completions_url = api_base_url
            .join("chat/completions")
            .context("Failed to create chat completions endpoint URL")?;

        Ok(Self {
            client,
            completions_url,
            api_key,
            model,
        })
    }
}

#[async_trait::async_trait]
impl DealExtractor for ExtractionClient {
    #[tracing::instrument(name = "Extract deal candidates", skip(self, content), fields(model = %self.model, content_len = content.len()))]
    async fn extract(&self, content: &str) -> anyhow::Result<Vec<serde_json::Value>> {
        let request = CompletionRequest {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: EXTRACTION_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let completion: CompletionResponse = self
            .client
            .post(self.completions_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(parse_candidates(&content))
    }
}

fn parse_candidates(content: &str) -> Vec<serde_json::Value> {
    let parsed = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!(%error, "Extraction output is not valid JSON");
            return Vec::new();
        }
    };

    match parsed.get("deals").and_then(|deals| deals.as_array()) {
        Some(deals) => deals.clone(),
        None => {
            tracing::warn!("Extraction output has no deals array");
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
