use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use anyhow::Context;

use secrecy::Secret;

use tracing_actix_web::TracingLogger;

use url::Url;

use crate::auth::OperatorSecret;
use crate::client::{
    DealExtractor, EmailClient, ExtractionClient, HttpSourceFetcher, MailSender, SmtpClient,
    SourceFetcher,
};
use crate::controller::{airports, deals, digest, ingest, notifications, subscriptions};
use crate::error::RestError;
use crate::repo::{DealRepo, MemoryRepo, PgDealRepo, PgSubscriberRepo, SubscriberRepo};
use crate::service::{
    Composer, DigestHook, DigestOptions, Dispatcher, IngestOptions, Ingestor, Outbox, Registry,
};
use crate::settings::{MailTransport, Settings};

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Stores and outside services the application talks to
pub struct Collaborators {
    pub deals: Arc<dyn DealRepo>,
    pub subscribers: Arc<dyn SubscriberRepo>,
    pub mailer: Arc<dyn MailSender>,
    pub fetcher: Arc<dyn SourceFetcher>,
    /// `None` when no extraction API key is configured
    pub extractor: Option<Arc<dyn DealExtractor>>,
}

/// Behaviour switches resolved from settings
pub struct AppOptions {
    pub base_url: Url,
    pub site_name: String,
    pub operator_secret: Option<Secret<String>>,
    pub max_connections: usize,
    pub send_timeout: Duration,
    pub cooldown: chrono::Duration,
    pub welcome_on_subscribe: bool,
    pub ingest: IngestOptions,
    pub digest: DigestOptions,
}

/// Services shared by every worker
pub struct AppState {
    deals: Arc<dyn DealRepo>,
    composer: Arc<Composer>,
    dispatcher: Arc<Dispatcher>,
    registry: Registry,
    digest: DigestHook,
    ingestor: Ingestor,
    operator_secret: OperatorSecret,
}

impl AppState {
    pub fn new(collaborators: Collaborators, options: AppOptions) -> anyhow::Result<Self> {
        let Collaborators {
            deals,
            subscribers,
            mailer,
            fetcher,
            extractor,
        } = collaborators;

        let composer = Arc::new(Composer::new(options.base_url, options.site_name)?);
        let outbox = Outbox::new(mailer, options.max_connections, options.send_timeout);

        let dispatcher = Arc::new(Dispatcher::new(
            deals.clone(),
            subscribers.clone(),
            outbox.clone(),
            composer.clone(),
            options.cooldown,
        ));
        let registry = Registry::new(
            subscribers.clone(),
            options.welcome_on_subscribe.then(|| dispatcher.clone()),
        );
        let digest = DigestHook::new(
            deals.clone(),
            subscribers,
            outbox,
            composer.clone(),
            options.digest,
        );
        let ingestor = Ingestor::new(deals.clone(), fetcher, extractor, options.ingest);

        Ok(Self {
            deals,
            composer,
            dispatcher,
            registry,
            digest,
            ingestor,
            operator_secret: OperatorSecret::new(options.operator_secret),
        })
    }

    /// Connect the stores and clients described by the settings
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (deals, subscribers) = if settings.database.in_memory() {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            let repo = Arc::new(MemoryRepo::new());
            (
                repo.clone() as Arc<dyn DealRepo>,
                repo as Arc<dyn SubscriberRepo>,
            )
        } else {
            let pool = settings.database.pool();
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            (
                Arc::new(PgDealRepo::new(pool.clone())) as Arc<dyn DealRepo>,
                Arc::new(PgSubscriberRepo::new(pool)) as Arc<dyn SubscriberRepo>,
            )
        };

        let email = &settings.email;
        let sender = email.sender()?;
        let mailer: Arc<dyn MailSender> = match email.transport()? {
            MailTransport::Api(api) => Arc::new(EmailClient::new(
                sender,
                email.timeout(),
                api.base_url()?,
                api.auth_token(),
            )?),
            MailTransport::Smtp(smtp) => Arc::new(SmtpClient::new(sender, smtp.options(email))?),
        };

        let ingest = &settings.ingest;
        let fetcher = Arc::new(HttpSourceFetcher::new(
            ingest.user_agent(),
            ingest.fetch_timeout(),
        )?);
        let extraction = &ingest.extraction;
        let extractor = match extraction.api_key() {
            Some(api_key) => Some(Arc::new(ExtractionClient::new(
                extraction.api_base_url()?,
                api_key,
                extraction.model().to_string(),
                extraction.timeout(),
            )?) as Arc<dyn DealExtractor>),
            None => {
                tracing::warn!("No extraction API key configured, ingestion is unavailable");
                None
            }
        };

        let collaborators = Collaborators {
            deals,
            subscribers,
            mailer,
            fetcher,
            extractor,
        };
        let options = AppOptions {
            base_url: settings.app.base_url()?,
            site_name: settings.app.site_name().to_string(),
            operator_secret: settings.notify.secret(),
            max_connections: email.max_connections(),
            send_timeout: email.timeout(),
            cooldown: settings.notify.cooldown(),
            welcome_on_subscribe: settings.notify.welcome_on_subscribe(),
            ingest: ingest.options()?,
            digest: settings.digest.options(),
        };

        Self::new(collaborators, options)
    }
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, state: AppState) -> anyhow::Result<Server> {
    if !state.operator_secret.is_set() {
        tracing::warn!("No operator secret configured, operator endpoints are open");
    }

    // Wrap application data
    let deal_repo = web::Data::from(state.deals);
    let composer = web::Data::from(state.composer);
    let dispatcher = web::Data::from(state.dispatcher);
    let registry = web::Data::new(state.registry);
    let digest_hook = web::Data::new(state.digest);
    let ingestor = web::Data::new(state.ingestor);
    let operator_secret = web::Data::new(state.operator_secret);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _req| RestError::ParseError(err.to_string()).into()),
            )
            .app_data(deal_repo.clone())
            .app_data(composer.clone())
            .app_data(dispatcher.clone())
            .app_data(registry.clone())
            .app_data(digest_hook.clone())
            .app_data(ingestor.clone())
            .app_data(operator_secret.clone())
            .service(health_check)
            .service(
                web::scope("/api")
                    .service(deals::scope())
                    .service(airports::scope())
                    .service(subscriptions::scope())
                    .service(notifications::scope())
                    .service(digest::scope())
                    .service(ingest::scope()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
