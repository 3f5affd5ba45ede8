use chrono::{DateTime, Utc};

use uuid::Uuid;

use crate::domain::AirportCode;
use crate::model::{Deal, DealFilter, NewDeal, NewSubscriber};

mod deals;
mod memory;
mod subscribers;

pub use deals::PgDealRepo;
pub use memory::MemoryRepo;
pub use subscribers::PgSubscriberRepo;

/// Deal repository trait, implemented for each store used.
/// NOTE: Intended to facilitate easier testing/mocking
#[async_trait::async_trait]
pub trait DealRepo: Send + Sync {
    /// Insert a new deal, returning `None` if a deal with the same link already exists
    async fn insert(&self, new_deal: &NewDeal) -> sqlx::Result<Option<Uuid>>;

    /// Insert a deal, or replace the attributes of the deal stored under the same link
    async fn upsert_by_link(&self, new_deal: &NewDeal) -> sqlx::Result<Uuid>;

    /// Fetch a single deal by ID
    async fn fetch_by_id(&self, id: Uuid) -> sqlx::Result<Option<Deal>>;

    /// Fetch published deals, newest first when unfiltered and cheapest first otherwise
    async fn fetch_published(&self, filter: &DealFilter, limit: i64) -> sqlx::Result<Vec<Deal>>;

    /// Fetch the cheapest published deals found since a point in time
    async fn fetch_cheapest_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> sqlx::Result<Vec<Deal>>;

    /// Distinct origin airports that have published deals, alphabetically
    async fn fetch_published_origins(&self) -> sqlx::Result<Vec<AirportCode>>;

    /// Flip the publication state, returning `false` if the deal does not exist
    async fn set_published(&self, id: Uuid, is_published: bool) -> sqlx::Result<bool>;

    /// Stamp the time of the last notification batch
    async fn mark_notified(&self, id: Uuid, notified_at: DateTime<Utc>) -> sqlx::Result<()>;
}

/// Subscriber repository trait, implemented for each store used.
#[async_trait::async_trait]
pub trait SubscriberRepo: Send + Sync {
    /// Insert a subscriber unless the address is already stored.
    /// Returns `true` if a new record was created.
    async fn insert_if_absent(&self, new_subscriber: &NewSubscriber) -> sqlx::Result<bool>;

    /// Delete a subscriber by canonical email, returning the number of removed records
    async fn delete_by_email(&self, email: &str) -> sqlx::Result<u64>;

    /// Fetch every stored subscriber address
    async fn fetch_all_emails(&self) -> sqlx::Result<Vec<String>>;
}
