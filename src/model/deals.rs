use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::domain::{AirportCode, DealLink, Month, PriceGbp, TripType};

/// Provenance tag for deals entered by an operator
pub const MANUAL_SOURCE: &str = "manual";

/// New Deal request, either from an operator or from ingestion
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub origin_airport: AirportCode,
    pub destination_airport: AirportCode,
    pub price_gbp: PriceGbp,
    pub link: DealLink,
    pub airline: Option<String>,
    pub trip_type: TripType,
    pub outbound_dates: Option<String>,
    pub source: String,
    pub is_published: bool,
}

/// Stored Deal record
#[derive(Debug, Clone)]
pub struct Deal {
    pub id: Uuid,
    pub origin_airport: AirportCode,
    pub destination_airport: AirportCode,
    pub price_gbp: PriceGbp,
    pub link: DealLink,
    pub airline: Option<String>,
    pub trip_type: TripType,
    /// Free text such as "Nov 10–20" or "Jan–Feb"
    pub outbound_dates: Option<String>,
    pub source: Option<String>,
    pub is_published: bool,
    /// Creation timestamp, auto-set by the store
    pub found_at: DateTime<Utc>,
    /// Set after a notification batch delivered at least one email
    pub last_notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Build the stored record for a new deal
    pub fn from_new(id: Uuid, new_deal: NewDeal, found_at: DateTime<Utc>) -> Self {
        Self {
            id,
            origin_airport: new_deal.origin_airport,
            destination_airport: new_deal.destination_airport,
            price_gbp: new_deal.price_gbp,
            link: new_deal.link,
            airline: new_deal.airline,
            trip_type: new_deal.trip_type,
            outbound_dates: new_deal.outbound_dates,
            source: Some(new_deal.source),
            is_published: new_deal.is_published,
            found_at,
            last_notified_at: None,
            expires_at: None,
        }
    }

    /// Whether a notification batch went out for this deal less than `cooldown` ago
    pub fn is_cooling_down(&self, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
        self.last_notified_at
            .map(|notified_at| now - notified_at < cooldown)
            .unwrap_or(false)
    }

    /// Months mentioned in the outbound dates
    pub fn months(&self) -> Vec<Month> {
        self.outbound_dates
            .as_deref()
            .map(|dates| Month::extract(dates).into_iter().collect())
            .unwrap_or_default()
    }
}

/// Filter for listing published deals
#[derive(Debug, Default, Clone)]
pub struct DealFilter {
    pub origin: Option<AirportCode>,
    pub month: Option<Month>,
}

impl DealFilter {
    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.month.is_none()
    }

    /// Whether a published deal matches the filter
    pub fn matches(&self, deal: &Deal) -> bool {
        let origin_matches = self
            .origin
            .as_ref()
            .map(|origin| origin == &deal.origin_airport)
            .unwrap_or(true);
        let month_matches = self
            .month
            .map(|month| {
                deal.outbound_dates
                    .as_deref()
                    .map(|dates| {
                        dates
                            .to_lowercase()
                            .contains(&month.abbreviation().to_lowercase())
                    })
                    .unwrap_or(false)
            })
            .unwrap_or(true);

        deal.is_published && origin_matches && month_matches
    }
}
