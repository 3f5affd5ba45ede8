use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};

use serde::Deserialize;

use serde_json::Value;

use crate::auth::OperatorSecret;
use crate::error::RestResult;
use crate::service::{DispatchOutcome, Dispatcher, NotifyTarget};

use super::RunSummary;

const DRY_RUN_HEADER: &str = "x-dry-run";

#[derive(Debug, Deserialize)]
pub struct NotifyQuery {
    dry: Option<String>,
    welcome: Option<String>,
}

#[derive(Debug, Default)]
pub struct NotifyBody {
    deal_id: Option<String>,
    welcome: bool,
}

impl NotifyBody {
    /// Unreadable bodies count as empty. Fields are read one by one, so a
    /// badly typed field never hides the others.
    fn parse_lenient(bytes: &[u8]) -> Self {
        let body: Value = serde_json::from_slice(bytes).unwrap_or_default();

        let deal_id = body
            .get("dealId")
            .filter(|value| is_truthy(value))
            .map(|value| match value {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            });
        let welcome = body.get("welcome").map(is_truthy).unwrap_or(false);

        Self { deal_id, welcome }
    }
}

/// JSON truthiness: null, false, 0 and "" are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_flag_set(value: Option<&str>) -> bool {
    value == Some("1")
}

/// Trigger a deal alert or welcome email for every subscriber
#[tracing::instrument(name = "Notify subscribers", skip(req, body, secret, dispatcher))]
#[post("")]
async fn notify(
    req: HttpRequest,
    query: web::Query<NotifyQuery>,
    body: web::Bytes,
    secret: web::Data<OperatorSecret>,
    dispatcher: web::Data<Dispatcher>,
) -> RestResult<impl Responder> {
    let body = NotifyBody::parse_lenient(&body);
    let welcome = body.welcome || is_flag_set(query.welcome.as_deref());
    let target = NotifyTarget::from_request(body.deal_id, welcome)?;

    secret.authorize(req.headers())?;

    let dry_run = is_flag_set(query.dry.as_deref())
        || is_flag_set(
            req.headers()
                .get(DRY_RUN_HEADER)
                .and_then(|value| value.to_str().ok()),
        );

    let summary = match dispatcher.notify(target, dry_run).await? {
        DispatchOutcome::RateLimited => RunSummary::skipped(Some("rate limited")),
        DispatchOutcome::NoRecipients => RunSummary::skipped(Some("no subscribers")),
        DispatchOutcome::DryRun {
            from,
            subject,
            would_send_to,
        } => RunSummary {
            ok: true,
            dry_run: Some(true),
            from: Some(from),
            subject: Some(subject),
            would_send_to: Some(would_send_to),
            ..Default::default()
        },
        DispatchOutcome::Delivered(report) => RunSummary::delivered(report.sent, report.failures),
    };

    Ok(HttpResponse::Ok().json(summary))
}

/// Notification API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/notify").service(notify)
}
