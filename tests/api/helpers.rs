use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{redirect, Client, Method, Response};

use secrecy::Secret;

use serde_json::json;

use url::Url;

use uuid::Uuid;

use wiremock::MockServer;

use flightdeals::app::{self, AppOptions, AppState, Collaborators};
use flightdeals::client::{
    DealExtractor, EmailClient, ExtractionClient, HttpSourceFetcher, Sender,
};
use flightdeals::domain::{PriceGbp, TripType};
use flightdeals::model::{NewDeal, NewSubscriber, MANUAL_SOURCE};
use flightdeals::repo::{DealRepo, MemoryRepo, SubscriberRepo};
use flightdeals::service::{DigestOptions, IngestOptions};

pub const SOURCE_PATH: &str = "/uk-deals/";

/// Knobs for a spawned application
pub struct TestOptions {
    pub secret: Option<&'static str>,
    pub digest_disabled: bool,
    pub extraction_key: bool,
    pub welcome_on_subscribe: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            secret: None,
            digest_disabled: false,
            extraction_key: true,
            welcome_on_subscribe: false,
        }
    }
}

pub struct TestApp {
    pub addr: String,
    secret: Option<&'static str>,

    pub client: Client,
    pub repo: Arc<MemoryRepo>,
    pub email_server: MockServer,
    pub source_server: MockServer,
    pub extraction_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let email_server = MockServer::start().await;
        let source_server = MockServer::start().await;
        let extraction_server = MockServer::start().await;

        let email_client = {
            let sender = Sender {
                name: Some("UK Flight Deals".into()),
                address: "alerts@test.com"
                    .parse()
                    .expect("Failed to parse sender email address"),
            };
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let extractor = options.extraction_key.then(|| {
            let api_base_url = Url::parse(&format!("{}/v1/", extraction_server.uri()))
                .expect("Failed to parse mock server uri");
            let client = ExtractionClient::new(
                api_base_url,
                Secret::new("sk-test".into()),
                "gpt-4o-mini".into(),
                Duration::from_secs(2),
            )
            .expect("Failed to create extraction client");
            Arc::new(client) as Arc<dyn DealExtractor>
        });

        let fetcher = HttpSourceFetcher::new("Mozilla/5.0", Duration::from_secs(2))
            .expect("Failed to create source fetcher");

        let repo = Arc::new(MemoryRepo::new());
        let collaborators = Collaborators {
            deals: repo.clone(),
            subscribers: repo.clone(),
            mailer: Arc::new(email_client),
            fetcher: Arc::new(fetcher),
            extractor,
        };
        let app_options = AppOptions {
            base_url: Url::parse(&addr).unwrap(),
            site_name: "UK Flight Deals".into(),
            operator_secret: options.secret.map(|secret| Secret::new(secret.into())),
            max_connections: 3,
            send_timeout: Duration::from_secs(2),
            cooldown: chrono::Duration::minutes(15),
            welcome_on_subscribe: options.welcome_on_subscribe,
            ingest: IngestOptions {
                sources: vec![Url::parse(&format!("{}{}", source_server.uri(), SOURCE_PATH))
                    .expect("Failed to parse mock server uri")],
                max_source_chars: 200_000,
            },
            digest: DigestOptions {
                disabled: options.digest_disabled,
                ..Default::default()
            },
        };

        let state =
            AppState::new(collaborators, app_options).expect("Failed to build app state");
        let server = app::run(listener, state).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build http client");

        Self {
            addr,
            secret: options.secret,
            client,
            repo,
            email_server,
            source_server,
            extraction_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    /// Request carrying the configured operator secret, if any
    pub fn operator_request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.request(method, url);
        match self.secret {
            Some(secret) => req.bearer_auth(secret),
            None => req,
        }
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn subscribe(&self, body: serde_json::Value) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/subscribe")
            .json(&body)
            .send()
            .await
    }

    pub async fn unsubscribe(&self, email: &str) -> reqwest::Result<Response> {
        self.request(Method::GET, "api/unsubscribe")
            .query(&[("email", email)])
            .send()
            .await
    }

    pub async fn notify(&self, query: &str, body: serde_json::Value) -> reqwest::Result<Response> {
        self.operator_request(Method::POST, &format!("api/notify{}", query))
            .json(&body)
            .send()
            .await
    }

    pub async fn digest(&self) -> reqwest::Result<Response> {
        self.operator_request(Method::POST, "api/digest")
            .send()
            .await
    }

    pub async fn ingest(&self) -> reqwest::Result<Response> {
        self.operator_request(Method::POST, "api/ingest")
            .send()
            .await
    }

    pub async fn list_deals(&self, query: &str) -> reqwest::Result<Response> {
        self.request(Method::GET, &format!("api/deals{}", query))
            .send()
            .await
    }

    pub async fn create_deal(&self, body: serde_json::Value) -> reqwest::Result<Response> {
        self.operator_request(Method::POST, "api/deals")
            .json(&body)
            .send()
            .await
    }

    pub async fn add_subscriber(&self, email: &str) {
        self.repo
            .insert_if_absent(&NewSubscriber::free(
                email.parse().expect("Failed to parse subscriber email"),
            ))
            .await
            .expect("Failed to store subscriber");
    }

    pub async fn add_deal(&self, origin: &str, price: i32, outbound_dates: Option<&str>) -> Uuid {
        let new_deal = NewDeal {
            origin_airport: origin.parse().expect("Failed to parse origin"),
            destination_airport: "JFK".parse().unwrap(),
            price_gbp: PriceGbp::try_from(price).expect("Failed to parse price"),
            link: format!("https://example.com/deals/{}", Uuid::new_v4())
                .parse()
                .unwrap(),
            airline: Some("Test Air".into()),
            trip_type: TripType::Return,
            outbound_dates: outbound_dates.map(Into::into),
            source: MANUAL_SOURCE.into(),
            is_published: true,
        };

        self.repo
            .upsert_by_link(&new_deal)
            .await
            .expect("Failed to store deal")
    }

    /// Requests received by the mail API so far
    pub async fn sent_emails(&self) -> Vec<serde_json::Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|req| serde_json::from_slice(&req.body).expect("Email body is not JSON"))
            .collect()
    }

    /// Poll the mail API until `count` emails arrived, for detached sends
    pub async fn wait_for_emails(&self, count: usize) -> Vec<serde_json::Value> {
        for _ in 0..50 {
            let emails = self.sent_emails().await;
            if emails.len() >= count {
                return emails;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sent_emails().await
    }
}

/// A chat completion wrapping the given deals the way the extraction API returns them
pub fn completion_with(deals: serde_json::Value) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": json!({ "deals": deals }).to_string(),
            }
        }]
    })
}
