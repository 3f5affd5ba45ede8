use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use crate::auth::Operator;
use crate::error::RestResult;
use crate::service::{DigestHook, DigestOutcome};

use super::RunSummary;

/// Send the weekly digest, called by an external scheduler
#[tracing::instrument(name = "Send weekly digest", skip(digest))]
#[post("")]
async fn send(_operator: Operator, digest: web::Data<DigestHook>) -> RestResult<impl Responder> {
    let summary = match digest.run().await? {
        DigestOutcome::Disabled => RunSummary {
            disabled: Some(true),
            ..RunSummary::skipped(None)
        },
        DigestOutcome::NoDeals => RunSummary::skipped(Some("no deals in last 7 days")),
        DigestOutcome::NoRecipients => RunSummary::skipped(None),
        DigestOutcome::Delivered(report) => RunSummary::delivered(report.sent, report.failures),
    };

    Ok(HttpResponse::Ok().json(summary))
}

/// Digest API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/digest").service(send)
}
