use chrono::{DateTime, Utc};

use crate::domain::EmailAddress;

/// Plan given to everyone who signs up through the public form
pub const DEFAULT_PLAN: &str = "free";

/// New Subscriber request
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: EmailAddress,
    pub plan: String,
}

impl NewSubscriber {
    pub fn free(email: EmailAddress) -> Self {
        Self {
            email,
            plan: DEFAULT_PLAN.into(),
        }
    }
}

/// Stored Subscriber record
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Canonical address, also the natural key
    pub email: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}
