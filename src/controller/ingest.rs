use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use crate::auth::Operator;
use crate::error::RestResult;
use crate::service::Ingestor;

use super::RunSummary;

/// Pull the configured sources and store the extracted deals
#[tracing::instrument(name = "Ingest deals", skip(ingestor))]
#[post("")]
async fn run(_operator: Operator, ingestor: web::Data<Ingestor>) -> RestResult<impl Responder> {
    let report = ingestor.run().await?;

    Ok(HttpResponse::Ok().json(RunSummary {
        ok: true,
        inserted: Some(report.inserted),
        ..Default::default()
    }))
}

/// Ingestion API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/ingest").service(run)
}
