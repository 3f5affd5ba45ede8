use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::auth::Operator;
use crate::domain::{Month, PriceGbp};
use crate::error::{RestError, RestResult};
use crate::model::{Deal, DealFilter, NewDeal, MANUAL_SOURCE};
use crate::repo::DealRepo;

const LIST_LIMIT: i64 = 50;

/// JSON body for operator-created deals
#[derive(Debug, Deserialize)]
pub struct CreateDealBody {
    #[serde(default)]
    origin_airport: String,
    #[serde(default)]
    destination_airport: String,
    #[serde(default)]
    price_gbp: serde_json::Value,
    #[serde(default)]
    link: String,
    airline: Option<String>,
    outbound_dates: Option<String>,
    trip_type: Option<String>,
}

fn field(name: &'static str) -> impl Fn(String) -> RestError {
    move |e| RestError::ParseError(format!("{} {}", name, e))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TryFrom<CreateDealBody> for NewDeal {
    type Error = RestError;

    fn try_from(body: CreateDealBody) -> RestResult<Self> {
        let trip_type = match non_blank(body.trip_type) {
            Some(trip_type) => trip_type.parse().map_err(field("trip_type"))?,
            None => Default::default(),
        };

        Ok(Self {
            origin_airport: body.origin_airport.parse().map_err(field("origin_airport"))?,
            destination_airport: body
                .destination_airport
                .parse()
                .map_err(field("destination_airport"))?,
            price_gbp: PriceGbp::from_json(&body.price_gbp).map_err(field("price_gbp"))?,
            link: body.link.parse().map_err(field("link"))?,
            airline: non_blank(body.airline),
            trip_type,
            outbound_dates: non_blank(body.outbound_dates),
            source: MANUAL_SOURCE.into(),
            is_published: true,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    origin: Option<String>,
    month: Option<String>,
}

impl TryFrom<ListQuery> for DealFilter {
    type Error = RestError;

    fn try_from(query: ListQuery) -> RestResult<Self> {
        let origin = non_blank(query.origin)
            .map(|origin| origin.parse())
            .transpose()
            .map_err(field("origin"))?;
        let month = non_blank(query.month)
            .map(|month| month.parse::<Month>())
            .transpose()
            .map_err(field("month"))?;

        Ok(Self { origin, month })
    }
}

/// Public listing entry. Filtered listings carry the booking details as well.
#[derive(Debug, Serialize)]
struct DealItem {
    id: Uuid,
    origin_airport: String,
    destination_airport: String,
    price_gbp: i32,
    outbound_dates: Option<String>,
    #[serde(flatten)]
    details: Option<DealDetails>,
}

#[derive(Debug, Serialize)]
struct DealDetails {
    airline: Option<String>,
    trip_type: String,
    link: String,
}

impl DealItem {
    fn new(deal: Deal, with_details: bool) -> Self {
        let details = with_details.then(|| DealDetails {
            airline: deal.airline,
            trip_type: deal.trip_type.to_string(),
            link: deal.link.to_string(),
        });

        Self {
            id: deal.id,
            origin_airport: deal.origin_airport.to_string(),
            destination_airport: deal.destination_airport.to_string(),
            price_gbp: deal.price_gbp.value(),
            outbound_dates: deal.outbound_dates,
            details,
        }
    }
}

#[derive(Serialize)]
struct Created {
    ok: bool,
    id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    is_published: bool,
}

/// List published deals
#[tracing::instrument(name = "List deals", skip(deals))]
#[get("")]
async fn list(
    query: web::Query<ListQuery>,
    deals: web::Data<dyn DealRepo>,
) -> RestResult<impl Responder> {
    let filter: DealFilter = query.into_inner().try_into()?;
    let with_details = !filter.is_empty();

    let items: Vec<DealItem> = deals
        .fetch_published(&filter, LIST_LIMIT)
        .await?
        .into_iter()
        .map(|deal| DealItem::new(deal, with_details))
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// Create a deal by hand
#[tracing::instrument(name = "Create a deal", skip(deals))]
#[post("")]
async fn create(
    _operator: Operator,
    body: web::Json<CreateDealBody>,
    deals: web::Data<dyn DealRepo>,
) -> RestResult<impl Responder> {
    let new_deal: NewDeal = body.into_inner().try_into()?;

    let id = deals
        .insert(&new_deal)
        .await?
        .ok_or_else(|| RestError::ParseError("link already exists".into()))?;

    Ok(HttpResponse::Ok().json(Created { ok: true, id }))
}

/// Publish or hide a deal
#[tracing::instrument(name = "Set deal publication", skip(deals))]
#[post("/{id}/publish")]
async fn publish(
    _operator: Operator,
    path: web::Path<(String,)>,
    body: web::Json<PublishBody>,
    deals: web::Data<dyn DealRepo>,
) -> RestResult<impl Responder> {
    let (id,) = path.into_inner();
    let not_found = || RestError::NotFound("Deal not found".into());

    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    if !deals.set_published(id, body.is_published).await? {
        return Err(not_found());
    }

    Ok(HttpResponse::NoContent())
}

/// Deals API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/deals")
        .service(list)
        .service(create)
        .service(publish)
}
