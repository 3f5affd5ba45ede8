use actix_web::dev::HttpServiceFactory;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};

use anyhow::Context;

use serde::{Deserialize, Serialize};

use url::form_urlencoded;

use crate::error::RestResult;
use crate::service::{Composer, Registry};

/// JSON body for new subscriptions
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
struct Subscribed {
    ok: bool,
}

/// Create endpoint for new subscriptions
#[tracing::instrument(name = "Create a new subscriber", skip(registry))]
#[post("")]
async fn create(
    body: web::Json<SubscribeBody>,
    registry: web::Data<Registry>,
) -> RestResult<impl Responder> {
    registry.subscribe(&body.email).await?;

    Ok(HttpResponse::Ok().json(Subscribed { ok: true }))
}

/// First `email` value of a query string. Malformed or repeated keys never fail.
fn unsubscribe_email(query: &str) -> String {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "email")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// One-click unsubscribe from the link in every email
#[tracing::instrument(name = "Remove a subscriber", skip(req, registry, composer))]
#[get("")]
async fn remove(
    req: HttpRequest,
    registry: web::Data<Registry>,
    composer: web::Data<Composer>,
) -> RestResult<impl Responder> {
    registry
        .unsubscribe(&unsubscribe_email(req.query_string()))
        .await;

    let location = composer
        .site_url()
        .join("subscribe?unsubscribed=1")
        .context("Failed to build unsubscribe redirect")?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_str()))
        .finish())
}

/// Subscriptions API endpoints
pub fn scope() -> impl HttpServiceFactory {
    (
        web::scope("/subscribe").service(create),
        web::scope("/unsubscribe").service(remove),
    )
}
