use std::collections::BTreeSet;

use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse, Responder};

use serde::Serialize;

use crate::domain::{AirportCode, Month};
use crate::error::{RestError, RestResult};
use crate::model::DealFilter;
use crate::repo::DealRepo;

/// Upper bound on deals scanned for month detection
const MONTH_SCAN_LIMIT: i64 = 1_000;

#[derive(Debug, Serialize)]
struct Airport {
    code: String,
    name: String,
}

impl From<AirportCode> for Airport {
    fn from(code: AirportCode) -> Self {
        Self {
            name: code.display_name().to_string(),
            code: code.to_string(),
        }
    }
}

/// Origin airports that currently have published deals
#[tracing::instrument(name = "List origin airports", skip(deals))]
#[get("")]
async fn list(deals: web::Data<dyn DealRepo>) -> RestResult<impl Responder> {
    let airports: Vec<Airport> = deals
        .fetch_published_origins()
        .await?
        .into_iter()
        .map(Airport::from)
        .collect();

    Ok(HttpResponse::Ok().json(airports))
}

/// Months with published deals from an origin, in calendar order
#[tracing::instrument(name = "List months for origin", skip(deals))]
#[get("/{origin}/months")]
async fn months(
    path: web::Path<(String,)>,
    deals: web::Data<dyn DealRepo>,
) -> RestResult<impl Responder> {
    let (origin,) = path.into_inner();
    let origin: AirportCode = origin
        .parse()
        .map_err(|e| RestError::ParseError(format!("origin {}", e)))?;

    let filter = DealFilter {
        origin: Some(origin),
        month: None,
    };
    let months: BTreeSet<Month> = deals
        .fetch_published(&filter, MONTH_SCAN_LIMIT)
        .await?
        .iter()
        .flat_map(|deal| deal.months())
        .collect();

    let months: Vec<&str> = months.iter().map(Month::abbreviation).collect();
    Ok(HttpResponse::Ok().json(months))
}

/// Airport API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/airports").service(list).service(months)
}
