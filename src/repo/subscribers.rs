use sqlx::PgPool;

use crate::model::NewSubscriber;

use super::SubscriberRepo;

/// Postgres Subscriber Repository
#[derive(Debug, Clone)]
pub struct PgSubscriberRepo {
    pool: PgPool,
}

impl PgSubscriberRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SubscriberRepo for PgSubscriberRepo {
    #[tracing::instrument(name = "Insert subscriber", skip(self))]
    async fn insert_if_absent(&self, new_subscriber: &NewSubscriber) -> sqlx::Result<bool> {
        let result = sqlx::query!(
            "insert into subscribers(email, plan) values ($1, $2) on conflict (email) do nothing",
            new_subscriber.email.as_ref(),
            new_subscriber.plan.as_str()
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete subscriber by email", skip(self))]
    async fn delete_by_email(&self, email: &str) -> sqlx::Result<u64> {
        let result = sqlx::query!("delete from subscribers where email=$1", email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "Fetch all subscriber emails", skip(self))]
    async fn fetch_all_emails(&self) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar!("select email from subscribers")
            .fetch_all(&self.pool)
            .await
    }
}
