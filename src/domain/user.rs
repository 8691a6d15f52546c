use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub credit: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            credit: Self::generate_credit(name, &now),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Opaque credit derived from the display name and registration time,
    /// so two users with the same name still get distinct credits.
    pub fn generate_credit(name: &str, registered_at: &DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(registered_at.to_rfc3339().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub credit: Option<String>,
}

impl UserFilter {
    pub fn by_credit(credit: &str) -> Self {
        Self {
            credit: Some(credit.to_string()),
        }
    }
}
