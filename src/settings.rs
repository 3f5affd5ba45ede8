use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use url::Url;

use crate::client::{Sender, SmtpOptions, SmtpSecurity};
use crate::service::{DigestOptions, IngestOptions};

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub notify: NotifySettings,
    pub ingest: IngestSettings,
    pub digest: DigestSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        // Get the path to the settings directory
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }

    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        let settings: Self = Config::builder()
            // Include the base settings
            .add_source(File::from(base_path.join("base")).required(true))
            // Include the runtime settings
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // Override/include any settings from environment variables
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Fail early on values that would only break at request time
    pub fn validate(&self) -> anyhow::Result<()> {
        self.app.base_url()?;
        self.email.sender()?;
        self.email.transport()?;
        self.ingest.options()?;
        if let Some(api) = &self.email.api {
            api.base_url()?;
        }
        self.ingest.extraction.api_base_url()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,

    /// Public URL used in links inside emails and redirects
    base_url: String,
    site_name: String,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    pub fn base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url).context("Invalid app.base_url")
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Run against the volatile in-process store instead of Postgres
    #[serde(default)]
    in_memory: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    require_ssl: bool,
    #[serde(
        default = "default_acquire_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    acquire_timeout_milliseconds: u64,
}

fn default_acquire_timeout() -> u64 {
    5_000
}

impl DatabaseSettings {
    pub fn in_memory(&self) -> bool {
        self.in_memory
    }

    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        use secrecy::ExposeSecret;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }

    /// The database connection options, with the database name
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }

    /// Lazily connected pool, so startup does not wait on the database
    pub fn pool(&self) -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(self.acquire_timeout_milliseconds))
            .connect_lazy_with(self.with_db())
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    sender: String,
    sender_name: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    max_connections: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    timeout_milliseconds: u64,

    api: Option<EmailApiSettings>,
    smtp: Option<SmtpSettings>,
}

/// The configured mail transport
pub enum MailTransport<'a> {
    Api(&'a EmailApiSettings),
    Smtp(&'a SmtpSettings),
}

impl EmailSettings {
    /// The mailbox application emails are sent from
    pub fn sender(&self) -> anyhow::Result<Sender> {
        let address = self
            .sender
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid email.sender: {}", e))?;

        Ok(Sender {
            name: self.sender_name.clone().filter(|name| !name.is_empty()),
            address,
        })
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Upper bound for a single send
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// The REST API transport wins when both are configured
    pub fn transport(&self) -> anyhow::Result<MailTransport<'_>> {
        match (&self.api, &self.smtp) {
            (Some(api), _) => Ok(MailTransport::Api(api)),
            (None, Some(smtp)) => Ok(MailTransport::Smtp(smtp)),
            (None, None) => anyhow::bail!("Missing configuration: email.api or email.smtp"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailApiSettings {
    base_url: String,
    auth_token: Secret<String>,
}

impl EmailApiSettings {
    /// The base URL for the email REST service
    pub fn base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url).context("Invalid email.api.base_url")
    }

    /// The authentication token to include when making email requests
    pub fn auth_token(&self) -> Secret<String> {
        self.auth_token.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SmtpSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    username: Option<String>,
    password: Option<Secret<String>>,
    #[serde(default)]
    security: SmtpSecurity,
}

impl SmtpSettings {
    pub fn options(&self, email: &EmailSettings) -> SmtpOptions {
        SmtpOptions {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            security: self.security,
            timeout: email.timeout(),
            max_connections: u32::try_from(email.max_connections).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotifySettings {
    /// Bearer secret for operator endpoints, open access when unset
    secret: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    cooldown_minutes: i64,
    welcome_on_subscribe: bool,
}

impl NotifySettings {
    pub fn secret(&self) -> Option<Secret<String>> {
        self.secret.clone()
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooldown_minutes)
    }

    pub fn welcome_on_subscribe(&self) -> bool {
        self.welcome_on_subscribe
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestSettings {
    sources: Vec<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    max_source_chars: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    fetch_timeout_milliseconds: u64,
    user_agent: String,

    pub extraction: ExtractionSettings,
}

impl IngestSettings {
    pub fn options(&self) -> anyhow::Result<IngestOptions> {
        let sources = self
            .sources
            .iter()
            .map(|source| {
                Url::parse(source).with_context(|| format!("Invalid ingest source {}", source))
            })
            .collect::<anyhow::Result<_>>()?;

        Ok(IngestOptions {
            sources,
            max_source_chars: self.max_source_chars,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_milliseconds)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractionSettings {
    api_base_url: String,
    /// Ingestion reports a configuration error when unset
    api_key: Option<Secret<String>>,
    model: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    timeout_milliseconds: u64,
}

impl ExtractionSettings {
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Invalid ingest.extraction.api_base_url")
    }

    pub fn api_key(&self) -> Option<Secret<String>> {
        use secrecy::ExposeSecret;

        self.api_key
            .clone()
            .filter(|key| !key.expose_secret().is_empty())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct DigestSettings {
    disabled: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    window_days: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    max_deals: i64,
}

impl DigestSettings {
    pub fn options(&self) -> DigestOptions {
        DigestOptions {
            disabled: self.disabled,
            window: chrono::Duration::days(self.window_days),
            max_deals: self.max_deals,
        }
    }
}
