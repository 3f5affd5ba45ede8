use std::net::TcpListener;

use anyhow::Context;

use flightdeals::app::{self, AppState};
use flightdeals::settings::Settings;
use flightdeals::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let state = AppState::from_settings(&settings).await?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    app::run(listener, state)?.await.context("Failed to run app")
}
