use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use tokio::sync::Mutex;

use uuid::Uuid;

use crate::domain::AirportCode;
use crate::model::{Deal, DealFilter, NewDeal, NewSubscriber, Subscriber};

use super::{DealRepo, SubscriberRepo};

/// Volatile in-process store with the same semantics as the Postgres repositories.
/// Used by tests and by local runs configured without a database.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    deals: Mutex<Vec<Deal>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdate the creation timestamp of a stored deal
    pub async fn set_found_at(&self, id: Uuid, found_at: DateTime<Utc>) -> bool {
        let mut deals = self.deals.lock().await;
        match deals.iter_mut().find(|deal| deal.id == id) {
            Some(deal) => {
                deal.found_at = found_at;
                true
            }
            None => false,
        }
    }
}

fn take(deals: impl Iterator<Item = Deal>, limit: i64) -> Vec<Deal> {
    deals.take(usize::try_from(limit).unwrap_or(0)).collect()
}

#[async_trait::async_trait]
impl DealRepo for MemoryRepo {
    async fn insert(&self, new_deal: &NewDeal) -> sqlx::Result<Option<Uuid>> {
        let mut deals = self.deals.lock().await;
        if deals.iter().any(|deal| deal.link == new_deal.link) {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        deals.push(Deal::from_new(id, new_deal.clone(), Utc::now()));
        Ok(Some(id))
    }

    async fn upsert_by_link(&self, new_deal: &NewDeal) -> sqlx::Result<Uuid> {
        let mut deals = self.deals.lock().await;
        match deals.iter_mut().find(|deal| deal.link == new_deal.link) {
            Some(existing) => {
                let replacement = Deal::from_new(existing.id, new_deal.clone(), existing.found_at);
                *existing = Deal {
                    last_notified_at: existing.last_notified_at,
                    expires_at: existing.expires_at,
                    ..replacement
                };
                Ok(existing.id)
            }
            None => {
                let id = Uuid::new_v4();
                deals.push(Deal::from_new(id, new_deal.clone(), Utc::now()));
                Ok(id)
            }
        }
    }

    async fn fetch_by_id(&self, id: Uuid) -> sqlx::Result<Option<Deal>> {
        let deals = self.deals.lock().await;
        Ok(deals.iter().find(|deal| deal.id == id).cloned())
    }

    async fn fetch_published(&self, filter: &DealFilter, limit: i64) -> sqlx::Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = {
            let deals = self.deals.lock().await;
            deals
                .iter()
                .filter(|deal| filter.matches(deal))
                .cloned()
                .collect()
        };

        if filter.is_empty() {
            deals.sort_by(|a, b| b.found_at.cmp(&a.found_at));
        } else {
            deals.sort_by_key(|deal| deal.price_gbp);
        }

        Ok(take(deals.into_iter(), limit))
    }

    async fn fetch_cheapest_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> sqlx::Result<Vec<Deal>> {
        let mut deals: Vec<Deal> = {
            let deals = self.deals.lock().await;
            deals
                .iter()
                .filter(|deal| deal.is_published && deal.found_at >= since)
                .cloned()
                .collect()
        };
        deals.sort_by_key(|deal| deal.price_gbp);

        Ok(take(deals.into_iter(), limit))
    }

    async fn fetch_published_origins(&self) -> sqlx::Result<Vec<AirportCode>> {
        let deals = self.deals.lock().await;
        let origins: BTreeSet<AirportCode> = deals
            .iter()
            .filter(|deal| deal.is_published)
            .map(|deal| deal.origin_airport.clone())
            .collect();

        Ok(origins.into_iter().collect())
    }

    async fn set_published(&self, id: Uuid, is_published: bool) -> sqlx::Result<bool> {
        let mut deals = self.deals.lock().await;
        match deals.iter_mut().find(|deal| deal.id == id) {
            Some(deal) => {
                deal.is_published = is_published;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_notified(&self, id: Uuid, notified_at: DateTime<Utc>) -> sqlx::Result<()> {
        let mut deals = self.deals.lock().await;
        if let Some(deal) = deals.iter_mut().find(|deal| deal.id == id) {
            deal.last_notified_at = Some(notified_at);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriberRepo for MemoryRepo {
    async fn insert_if_absent(&self, new_subscriber: &NewSubscriber) -> sqlx::Result<bool> {
        let mut subscribers = self.subscribers.lock().await;
        let email = new_subscriber.email.as_ref();
        if subscribers.iter().any(|subscriber| subscriber.email == email) {
            return Ok(false);
        }

        subscribers.push(Subscriber {
            email: email.to_string(),
            plan: new_subscriber.plan.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn delete_by_email(&self, email: &str) -> sqlx::Result<u64> {
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.email != email);
        Ok((before - subscribers.len()) as u64)
    }

    async fn fetch_all_emails(&self) -> sqlx::Result<Vec<String>> {
        let subscribers = self.subscribers.lock().await;
        Ok(subscribers
            .iter()
            .map(|subscriber| subscriber.email.clone())
            .collect())
    }
}
