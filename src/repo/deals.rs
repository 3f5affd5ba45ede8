use chrono::{DateTime, Utc};

use sqlx::{PgPool, Postgres, QueryBuilder};

use uuid::Uuid;

use crate::domain::AirportCode;
use crate::model::{Deal, DealFilter, NewDeal};

use super::DealRepo;

/// Raw `deals` row, validated into a [`Deal`] at the repository boundary
#[derive(Debug, sqlx::FromRow)]
struct DealRow {
    id: Uuid,
    origin_airport: String,
    destination_airport: String,
    price_gbp: i32,
    link: String,
    airline: Option<String>,
    trip_type: Option<String>,
    outbound_dates: Option<String>,
    source: Option<String>,
    is_published: bool,
    found_at: DateTime<Utc>,
    last_notified_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

fn field(name: &'static str) -> impl Fn(String) -> String {
    move |e| format!("{} {}", name, e)
}

impl TryFrom<DealRow> for Deal {
    type Error = String;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            origin_airport: row.origin_airport.parse().map_err(field("origin_airport"))?,
            destination_airport: row
                .destination_airport
                .parse()
                .map_err(field("destination_airport"))?,
            price_gbp: row.price_gbp.try_into().map_err(field("price_gbp"))?,
            link: row.link.parse().map_err(field("link"))?,
            airline: row.airline,
            trip_type: row
                .trip_type
                .as_deref()
                .unwrap_or_default()
                .parse()
                .map_err(field("trip_type"))?,
            outbound_dates: row.outbound_dates,
            source: row.source,
            is_published: row.is_published,
            found_at: row.found_at,
            last_notified_at: row.last_notified_at,
            expires_at: row.expires_at,
        })
    }
}

/// Keep valid rows, logging the ones that fail validation
fn valid_deals(rows: Vec<DealRow>) -> Vec<Deal> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match Deal::try_from(row) {
                Ok(deal) => Some(deal),
                Err(error) => {
                    tracing::warn!(%error, "Skipping an invalid deal record (id: {})", id);
                    None
                }
            }
        })
        .collect()
}

/// Postgres Deal Repository
#[derive(Debug, Clone)]
pub struct PgDealRepo {
    pool: PgPool,
}

impl PgDealRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DealRepo for PgDealRepo {
    #[tracing::instrument(name = "Insert deal", skip(self))]
    async fn insert(&self, new_deal: &NewDeal) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar!(
            r#"insert into deals(origin_airport, destination_airport, price_gbp, link, airline, trip_type, outbound_dates, source, is_published)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (link) do nothing
            returning id as "id!""#,
            new_deal.origin_airport.as_ref(),
            new_deal.destination_airport.as_ref(),
            new_deal.price_gbp.value(),
            new_deal.link.as_ref(),
            new_deal.airline.as_deref(),
            new_deal.trip_type.as_ref(),
            new_deal.outbound_dates.as_deref(),
            new_deal.source.as_str(),
            new_deal.is_published,
        )
        .fetch_optional(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Upsert deal by link", skip(self))]
    async fn upsert_by_link(&self, new_deal: &NewDeal) -> sqlx::Result<Uuid> {
        sqlx::query_scalar!(
            r#"insert into deals(origin_airport, destination_airport, price_gbp, link, airline, trip_type, outbound_dates, source, is_published)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (link) do update set
                origin_airport = excluded.origin_airport,
                destination_airport = excluded.destination_airport,
                price_gbp = excluded.price_gbp,
                airline = excluded.airline,
                trip_type = excluded.trip_type,
                outbound_dates = excluded.outbound_dates,
                source = excluded.source,
                is_published = excluded.is_published
            returning id as "id!""#,
            new_deal.origin_airport.as_ref(),
            new_deal.destination_airport.as_ref(),
            new_deal.price_gbp.value(),
            new_deal.link.as_ref(),
            new_deal.airline.as_deref(),
            new_deal.trip_type.as_ref(),
            new_deal.outbound_dates.as_deref(),
            new_deal.source.as_str(),
            new_deal.is_published,
        )
        .fetch_one(&self.pool)
        .await
    }

    #[tracing::instrument(name = "Fetch deal by id", skip(self))]
    async fn fetch_by_id(&self, id: Uuid) -> sqlx::Result<Option<Deal>> {
        let row = sqlx::query_as!(
            DealRow,
            "select id, origin_airport, destination_airport, price_gbp, link, airline, trip_type, outbound_dates, source, is_published, found_at, last_notified_at, expires_at from deals where id=$1",
            id
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(Deal::try_from)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(e.into()))
    }

    #[tracing::instrument(name = "Fetch published deals", skip(self))]
    async fn fetch_published(&self, filter: &DealFilter, limit: i64) -> sqlx::Result<Vec<Deal>> {
        // Filters vary per request, so this one is assembled at runtime
        let mut query = QueryBuilder::<Postgres>::new("select * from deals where is_published = true");
        if let Some(origin) = &filter.origin {
            query
                .push(" and origin_airport = ")
                .push_bind(origin.as_ref().to_string());
        }
        if let Some(month) = filter.month {
            query
                .push(" and outbound_dates ilike ")
                .push_bind(format!("%{}%", month));
        }
        if filter.is_empty() {
            query.push(" order by found_at desc");
        } else {
            query.push(" order by price_gbp asc");
        }
        query.push(" limit ").push_bind(limit);

        let rows = query
            .build_query_as::<DealRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(valid_deals(rows))
    }

    #[tracing::instrument(name = "Fetch cheapest recent deals", skip(self))]
    async fn fetch_cheapest_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> sqlx::Result<Vec<Deal>> {
        let rows = sqlx::query_as!(
            DealRow,
            "select id, origin_airport, destination_airport, price_gbp, link, airline, trip_type, outbound_dates, source, is_published, found_at, last_notified_at, expires_at from deals where is_published = true and found_at >= $1 order by price_gbp asc limit $2",
            since,
            limit
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(valid_deals(rows))
    }

    #[tracing::instrument(name = "Fetch published origins", skip(self))]
    async fn fetch_published_origins(&self) -> sqlx::Result<Vec<AirportCode>> {
        let origins = sqlx::query_scalar!(
            "select distinct origin_airport from deals where is_published = true order by origin_airport"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(origins
            .into_iter()
            .filter_map(|origin| origin.parse().ok())
            .collect())
    }

    #[tracing::instrument(name = "Set deal publication state", skip(self))]
    async fn set_published(&self, id: Uuid, is_published: bool) -> sqlx::Result<bool> {
        let result = sqlx::query!(
            "update deals set is_published=$2 where id=$1",
            id,
            is_published
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Mark deal as notified", skip(self))]
    async fn mark_notified(&self, id: Uuid, notified_at: DateTime<Utc>) -> sqlx::Result<()> {
        sqlx::query!(
            "update deals set last_notified_at=$2 where id=$1",
            id,
            notified_at
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
