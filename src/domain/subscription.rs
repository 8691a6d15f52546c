use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_credit: String,
    pub channel_credit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(user_credit: &str, channel_credit: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_credit: user_credit.to_string(),
            channel_credit: channel_credit.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_credit: Option<String>,
    pub channel_credit: Option<String>,
}

impl SubscriptionFilter {
    pub fn by_user(user_credit: &str) -> Self {
        Self {
            user_credit: Some(user_credit.to_string()),
            channel_credit: None,
        }
    }

    pub fn by_pair(user_credit: &str, channel_credit: &str) -> Self {
        Self {
            user_credit: Some(user_credit.to_string()),
            channel_credit: Some(channel_credit.to_string()),
        }
    }
}
