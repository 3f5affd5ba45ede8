use std::sync::Arc;

use futures::future::join_all;

use serde::Deserialize;

use url::Url;

use crate::client::{DealExtractor, SourceFetcher};
use crate::domain::{DealLink, PriceGbp, TripType};
use crate::error::{Error, Result};
use crate::model::NewDeal;
use crate::repo::DealRepo;

/// Provenance tag for links that match none of the configured sources
pub const EXTRACTED_SOURCE: &str = "llm-extract";

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub sources: Vec<Url>,
    /// Page content beyond this many characters is dropped before extraction
    pub max_source_chars: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct IngestReport {
    pub inserted: usize,
    pub rejected: usize,
}

/// Unvalidated deal as produced by the extractor
#[derive(Debug, Deserialize)]
struct CandidateDeal {
    origin_airport: Option<String>,
    destination_airport: Option<String>,
    price_gbp: Option<serde_json::Value>,
    airline: Option<String>,
    trip_type: Option<String>,
    outbound_dates: Option<String>,
    link: Option<String>,
}

/// Pulls listing pages, extracts candidate deals and upserts the valid ones
pub struct Ingestor {
    deals: Arc<dyn DealRepo>,
    fetcher: Arc<dyn SourceFetcher>,
    extractor: Option<Arc<dyn DealExtractor>>,
    options: IngestOptions,
}

impl Ingestor {
    /// `extractor` is `None` when no extraction API key is configured
    pub fn new(
        deals: Arc<dyn DealRepo>,
        fetcher: Arc<dyn SourceFetcher>,
        extractor: Option<Arc<dyn DealExtractor>>,
        options: IngestOptions,
    ) -> Self {
        Self {
            deals,
            fetcher,
            extractor,
            options,
        }
    }

    #[tracing::instrument(name = "Run deal ingestion", skip(self))]
    pub async fn run(&self) -> Result<IngestReport> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or_else(|| Error::Configuration("ingest.extraction.api_key".into()))?;

        let content = self.fetch_sources().await;
        let candidates = extractor
            .extract(&content)
            .await
            .map_err(|e| Error::Upstream(format!("Deal extraction failed: {}", e)))?;

        let mut report = IngestReport::default();
        for candidate in candidates {
            let new_deal = match validate_candidate(candidate, &self.options.sources) {
                Ok(new_deal) => new_deal,
                Err(reason) => {
                    tracing::debug!(%reason, "Dropping deal candidate");
                    report.rejected += 1;
                    continue;
                }
            };

            match self.deals.upsert_by_link(&new_deal).await {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    tracing::error!(error.cause_chain = ?e, link = %new_deal.link, "Failed to upsert deal");
                }
            }
        }

        tracing::info!(
            inserted = report.inserted,
            rejected = report.rejected,
            "Deal ingestion finished"
        );
        Ok(report)
    }

    /// Fetch every source concurrently and join the tagged content
    async fn fetch_sources(&self) -> String {
        let pages = join_all(self.options.sources.iter().map(|url| async move {
            let html = match self.fetcher.fetch(url).await {
                Ok(html) => truncate_chars(html, self.options.max_source_chars),
                Err(e) => {
                    tracing::warn!(error.cause_chain = ?e, %url, "Failed to fetch deal source");
                    String::new()
                }
            };
            format!("SOURCE_URL: {}\nHTML:\n{}", url, html)
        }))
        .await;

        pages.join(SOURCE_SEPARATOR)
    }
}

fn truncate_chars(mut value: String, max_chars: usize) -> String {
    if let Some((index, _)) = value.char_indices().nth(max_chars) {
        value.truncate(index);
    }
    value
}

fn validate_candidate(
    candidate: serde_json::Value,
    sources: &[Url],
) -> std::result::Result<NewDeal, String> {
    let candidate: CandidateDeal =
        serde_json::from_value(candidate).map_err(|e| format!("malformed candidate: {}", e))?;

    let origin_airport = candidate
        .origin_airport
        .unwrap_or_default()
        .parse()
        .map_err(|e| format!("origin_airport {}", e))?;
    let destination_airport = candidate
        .destination_airport
        .unwrap_or_default()
        .parse()
        .map_err(|e| format!("destination_airport {}", e))?;
    let price_gbp = candidate
        .price_gbp
        .as_ref()
        .ok_or_else(|| "price_gbp required".to_string())
        .and_then(|price| PriceGbp::from_json(price).map_err(|e| format!("price_gbp {}", e)))?;
    let link: DealLink = candidate
        .link
        .unwrap_or_default()
        .parse()
        .map_err(|e| format!("link {}", e))?;

    Ok(NewDeal {
        source: source_tag(&link, sources),
        origin_airport,
        destination_airport,
        price_gbp,
        link,
        airline: candidate.airline,
        trip_type: TripType::parse_lenient(candidate.trip_type.as_deref()),
        outbound_dates: candidate.outbound_dates,
        is_published: true,
    })
}

/// The source whose host is the link's host or one of its parent domains
fn source_tag(link: &DealLink, sources: &[Url]) -> String {
    let link_host = match link.host() {
        Some(host) => host.to_lowercase(),
        None => return EXTRACTED_SOURCE.into(),
    };

    sources
        .iter()
        .find(|source| {
            source
                .host_str()
                .map(|host| host.strip_prefix("www.").unwrap_or(host).to_lowercase())
                .map(|host| link_host == host || link_host.ends_with(&format!(".{}", host)))
                .unwrap_or(false)
        })
        .map(|source| source.to_string())
        .unwrap_or_else(|| EXTRACTED_SOURCE.into())
}
